//! NCI Chemical Identifier Resolver (CIR) client
//!
//! # API Reference
//! - Endpoint: https://cactus.nci.nih.gov/chemical/structure/{identifier}/{representation}
//! - Plain text responses, one result per line
//! - 404 when the identifier does not resolve

use super::http::{endpoint, RateLimitedClient};
use super::{conversions, declares, ConversionError, ConversionService, HttpSession};
use crate::job::Conversion;
use crate::record::AttributeValue;
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

pub const SERVICE_ID: &str = "CIR";

const CIR_BASE_URL: &str = "https://cactus.nci.nih.gov/chemical/structure/";

const REQUESTS_PER_SECOND: u32 = 2;

const CONVERSIONS: &[(&str, &str)] = &[
    ("smiles", "inchikey"),
    ("inchikey", "smiles"),
    ("inchikey", "inchi"),
    ("inchikey", "casno"),
    ("inchikey", "formula"),
    ("casno", "smiles"),
];

/// CIR representation name for a target attribute
fn representation(target: &str) -> Option<&'static str> {
    match target {
        "smiles" => Some("smiles"),
        "inchikey" => Some("stdinchikey"),
        "inchi" => Some("stdinchi"),
        "casno" => Some("cas"),
        "formula" => Some("formula"),
        _ => None,
    }
}

/// Interpret a CIR response
///
/// The first non-empty line is the answer. `stdinchikey` answers carry an
/// `InChIKey=` prefix which is stripped. An HTML page in place of text means
/// the resolver answered with something other than a result.
fn parse_response(status: StatusCode, body: &str) -> Result<String, ConversionError> {
    if status == StatusCode::NOT_FOUND {
        return Err(ConversionError::DataNotRetrieved(
            "CIR: identifier not resolved".to_string(),
        ));
    }

    if !status.is_success() {
        return Err(ConversionError::DataNotRetrieved(format!(
            "CIR: HTTP {}",
            status.as_u16()
        )));
    }

    let first = body
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| ConversionError::DataNotRetrieved("CIR: empty response".to_string()))?;

    if first.starts_with('<') {
        return Err(ConversionError::UnknownResponse(
            "CIR: markup instead of plain text".to_string(),
        ));
    }

    Ok(first.strip_prefix("InChIKey=").unwrap_or(first).to_string())
}

/// CIR lookup service
pub struct Cir {
    http: RateLimitedClient,
}

impl Cir {
    pub fn new(session: &HttpSession) -> Self {
        Self {
            http: RateLimitedClient::new(SERVICE_ID, session, REQUESTS_PER_SECOND),
        }
    }
}

#[async_trait]
impl ConversionService for Cir {
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
        let repr = match representation(target) {
            Some(repr) if declares(CONVERSIONS, source, target) => repr,
            _ => return Err(ConversionError::not_supported(SERVICE_ID, source, target)),
        };

        let url = endpoint(CIR_BASE_URL, &[value, repr])?;
        let fetched = self.http.get(url).await?;

        debug!(service = SERVICE_ID, status = %fetched.status, source, target, "CIR responded");

        parse_response(fetched.status, &fetched.body).map(AttributeValue::String)
    }
}
