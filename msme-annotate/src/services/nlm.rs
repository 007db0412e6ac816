//! NLM ChemIDplus client
//!
//! # API Reference
//! - Endpoint: https://chem.nlm.nih.gov/api/data/{field}/equals/{value}?data=summary
//! - Summary fields: `na` (name), `f` (formula), `rn` (CAS registry number),
//!   `ik` (InChIKey)

use super::http::{endpoint, RateLimitedClient};
use super::{conversions, declares, ConversionError, ConversionService, HttpSession};
use crate::job::Conversion;
use crate::record::AttributeValue;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

pub const SERVICE_ID: &str = "NLM";

const NLM_BASE_URL: &str = "https://chem.nlm.nih.gov/api/data/";

const REQUESTS_PER_SECOND: u32 = 3;

const CONVERSIONS: &[(&str, &str)] = &[
    ("inchikey", "name"),
    ("inchikey", "formula"),
    ("inchikey", "casno"),
    ("name", "inchikey"),
];

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    summary: Summary,
}

#[derive(Debug, Default, Deserialize)]
struct Summary {
    #[serde(default)]
    na: Option<String>,
    #[serde(default)]
    f: Option<String>,
    #[serde(default)]
    rn: Option<String>,
    #[serde(default)]
    ik: Option<String>,
}

impl Summary {
    fn field(&self, target: &str) -> Option<&str> {
        match target {
            "name" => self.na.as_deref(),
            "formula" => self.f.as_deref(),
            "casno" => self.rn.as_deref(),
            "inchikey" => self.ik.as_deref(),
            _ => None,
        }
    }
}

/// `target` from the first search result carrying it
fn parse_summary(status: StatusCode, body: &str, target: &str) -> Result<String, ConversionError> {
    if status == StatusCode::NOT_FOUND {
        return Err(ConversionError::DataNotRetrieved("NLM: no match".to_string()));
    }
    if !status.is_success() {
        return Err(ConversionError::DataNotRetrieved(format!(
            "NLM: HTTP {}",
            status.as_u16()
        )));
    }

    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| ConversionError::UnknownResponse(format!("NLM: {}", e)))?;

    let found = response
        .results
        .iter()
        .find_map(|r| r.summary.field(target))
        .ok_or_else(|| ConversionError::DataNotRetrieved(format!("NLM: no {} found", target)))?;

    // ChemIDplus writes formulas element by element (`C8-H10-N4-O2`)
    if target == "formula" {
        Ok(found.replace('-', ""))
    } else {
        Ok(found.to_string())
    }
}

/// NLM ChemIDplus lookup service
pub struct Nlm {
    http: RateLimitedClient,
}

impl Nlm {
    pub fn new(session: &HttpSession) -> Self {
        Self {
            http: RateLimitedClient::new(SERVICE_ID, session, REQUESTS_PER_SECOND),
        }
    }
}

#[async_trait]
impl ConversionService for Nlm {
    fn name(&self) -> &str {
        SERVICE_ID
    }

    fn capabilities(&self) -> Vec<Conversion> {
        conversions(CONVERSIONS)
    }

    async fn convert(
        &self,
        source: &str,
        target: &str,
        value: &str,
    ) -> Result<AttributeValue, ConversionError> {
        if !declares(CONVERSIONS, source, target) {
            return Err(ConversionError::not_supported(SERVICE_ID, source, target));
        }

        let mut url = endpoint(NLM_BASE_URL, &[source, "equals", value])?;
        url.query_pairs_mut()
            .append_pair("data", "summary")
            .append_pair("limit", "1");

        let fetched = self.http.get(url).await?;
        debug!(service = SERVICE_ID, status = %fetched.status, source, target, "NLM responded");

        parse_summary(fetched.status, &fetched.body, target).map(AttributeValue::String)
    }
}
