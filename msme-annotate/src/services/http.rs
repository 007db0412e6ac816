//! Shared HTTP session and rate-limited request helpers
//!
//! One [`HttpSession`] is created per run and shared by every service; the
//! underlying `reqwest::Client` pools connections. Each service wraps it in a
//! [`RateLimitedClient`] with its own request quota.

use super::ConversionError;
use crate::error::{AnnotateError, AnnotateResult};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use msme_common::config::HttpConfig;
use reqwest::{Client, StatusCode, Url};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

/// The run's shared network connection resource
///
/// Cloning is cheap and shares the connection pool. Dropping the last clone
/// releases it.
#[derive(Debug, Clone)]
pub struct HttpSession {
    client: Client,
}

impl HttpSession {
    /// Build the shared client
    ///
    /// # Errors
    /// [`AnnotateError::Connection`] if the client cannot be constructed
    /// (e.g. TLS backend initialisation failure, invalid User-Agent)
    pub fn connect(config: &HttpConfig) -> AnnotateResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnnotateError::Connection(e.to_string()))?;

        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Response body with its status
#[derive(Debug, Clone)]
pub(crate) struct Fetched {
    pub status: StatusCode,
    pub body: String,
}

/// Rate-limited view of the shared session for one service
pub(crate) struct RateLimitedClient {
    service: &'static str,
    client: Client,
    rate_limiter: DefaultDirectRateLimiter,
}

impl RateLimitedClient {
    pub fn new(service: &'static str, session: &HttpSession, requests_per_second: u32) -> Self {
        // No bursts: permits are spaced evenly at 1/requests_per_second
        let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::MIN);

        Self {
            service,
            client: session.client().clone(),
            rate_limiter: RateLimiter::direct(quota),
        }
    }

    /// GET `url`, returning status and body
    ///
    /// Transport failures map to `DataNotRetrieved`.
    pub async fn get(&self, url: Url) -> Result<Fetched, ConversionError> {
        self.rate_limiter.until_ready().await;
        debug!(service = self.service, url = %url, "GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ConversionError::DataNotRetrieved(format!("{}: {}", self.service, e)))?;

        self.read(response).await
    }

    /// POST an urlencoded form to `url`, returning status and body
    pub async fn post_form(
        &self,
        url: Url,
        form: &[(&str, &str)],
    ) -> Result<Fetched, ConversionError> {
        self.rate_limiter.until_ready().await;
        debug!(service = self.service, url = %url, "POST");

        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| ConversionError::DataNotRetrieved(format!("{}: {}", self.service, e)))?;

        self.read(response).await
    }

    async fn read(&self, response: reqwest::Response) -> Result<Fetched, ConversionError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ConversionError::DataNotRetrieved(format!("{}: {}", self.service, e)))?;

        Ok(Fetched { status, body })
    }
}

/// `base` with `segments` appended, each percent-encoded as one path segment
///
/// Identifiers such as InChI strings contain `/`, which must not split the
/// path.
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<Url, ConversionError> {
    let mut url = Url::parse(base)
        .map_err(|e| ConversionError::DataNotRetrieved(format!("bad endpoint {}: {}", base, e)))?;

    {
        let mut path = url.path_segments_mut().map_err(|_| {
            ConversionError::DataNotRetrieved(format!("endpoint {} cannot take a path", base))
        })?;
        path.pop_if_empty();
        path.extend(segments);
    }

    Ok(url)
}
