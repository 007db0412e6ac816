//! Chemical Translation Service (CTS) client
//!
//! Two endpoints are used:
//! - `rest/convert/{from}/{to}/{value}` translates names and CAS numbers to
//!   InChIKeys
//! - `service/compound/{inchikey}` returns a compound record holding the InChI
//!   and its synonyms

use super::http::{endpoint, RateLimitedClient};
use super::{conversions, declares, ConversionError, ConversionService, HttpSession};
use crate::job::Conversion;
use crate::record::AttributeValue;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

pub const SERVICE_ID: &str = "CTS";

const CTS_CONVERT_URL: &str = "https://cts.fiehnlab.ucdavis.edu/rest/convert/";
const CTS_COMPOUND_URL: &str = "https://cts.fiehnlab.ucdavis.edu/service/compound/";

const REQUESTS_PER_SECOND: u32 = 3;

const CONVERSIONS: &[(&str, &str)] = &[
    ("casno", "inchikey"),
    ("name", "inchikey"),
    ("inchikey", "name"),
    ("inchikey", "inchi"),
    ("inchikey", "iupac_name"),
];

/// One entry of a `rest/convert` answer
#[derive(Debug, Deserialize)]
struct Translation {
    #[serde(default)]
    results: Vec<String>,
}

/// `service/compound` answer
#[derive(Debug, Deserialize)]
struct CompoundRecord {
    #[serde(default)]
    inchikey: Option<String>,
    #[serde(default)]
    inchicode: Option<String>,
    #[serde(default)]
    synonyms: Vec<Synonym>,
}

#[derive(Debug, Deserialize)]
struct Synonym {
    #[serde(rename = "type")]
    kind: String,
    name: String,
}

/// CTS identifier name for an attribute on the convert endpoint
fn identifier(attribute: &str) -> Option<&'static str> {
    match attribute {
        "casno" => Some("CAS"),
        "name" => Some("Chemical Name"),
        "inchikey" => Some("InChIKey"),
        _ => None,
    }
}

fn check_status(status: StatusCode) -> Result<(), ConversionError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(ConversionError::DataNotRetrieved(format!(
            "CTS: HTTP {}",
            status.as_u16()
        )))
    }
}

/// First result of a `rest/convert` answer
fn parse_translation(body: &str) -> Result<String, ConversionError> {
    let translations: Vec<Translation> = serde_json::from_str(body)
        .map_err(|e| ConversionError::UnknownResponse(format!("CTS: {}", e)))?;

    translations
        .into_iter()
        .flat_map(|t| t.results)
        .find(|r| !r.trim().is_empty())
        .ok_or_else(|| ConversionError::DataNotRetrieved("CTS: no translation".to_string()))
}

/// `target` out of a `service/compound` answer
fn parse_compound(body: &str, target: &str) -> Result<String, ConversionError> {
    let record: CompoundRecord = serde_json::from_str(body)
        .map_err(|e| ConversionError::UnknownResponse(format!("CTS: {}", e)))?;

    if record.inchikey.is_none() {
        return Err(ConversionError::DataNotRetrieved(
            "CTS: compound not found".to_string(),
        ));
    }

    let synonym = |kind: &str| {
        record
            .synonyms
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.name.clone())
    };

    let found = match target {
        "inchi" => record.inchicode.clone(),
        "name" => synonym("Synonym"),
        "iupac_name" => synonym("IUPAC Name (Preferred)"),
        _ => None,
    };

    found.ok_or_else(|| ConversionError::DataNotRetrieved(format!("CTS: no {} in record", target)))
}

/// CTS lookup service
pub struct Cts {
    http: RateLimitedClient,
}

impl Cts {
    pub fn new(session: &HttpSession) -> Self {
        Self {
            http: RateLimitedClient::new(SERVICE_ID, session, REQUESTS_PER_SECOND),
        }
    }

    async fn translate(&self, source: &str, target: &str, value: &str) -> Result<String, ConversionError> {
        let (from, to) = match (identifier(source), identifier(target)) {
            (Some(from), Some(to)) => (from, to),
            _ => return Err(ConversionError::not_supported(SERVICE_ID, source, target)),
        };

        let url = endpoint(CTS_CONVERT_URL, &[from, to, value])?;
        let fetched = self.http.get(url).await?;
        debug!(service = SERVICE_ID, status = %fetched.status, source, target, "CTS convert responded");

        check_status(fetched.status)?;
        parse_translation(&fetched.body)
    }

    async fn compound(&self, target: &str, inchikey: &str) -> Result<String, ConversionError> {
        let url = endpoint(CTS_COMPOUND_URL, &[inchikey])?;
        let fetched = self.http.get(url).await?;
        debug!(service = SERVICE_ID, status = %fetched.status, target, "CTS compound responded");

        check_status(fetched.status)?;
        parse_compound(&fetched.body, target)
    }
}

#[async_trait]
impl ConversionService for Cts {
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

        let result = if source == "inchikey" {
            self.compound(target, value).await?
        } else {
            self.translate(source, target, value).await?
        };

        Ok(AttributeValue::String(result))
    }
}
