//! PubChem PUG REST client
//!
//! Queries compound records by InChI or by name and reads the requested
//! identifier out of the compound's property list.
//!
//! # API Reference
//! - Endpoint: https://pubchem.ncbi.nlm.nih.gov/rest/pug/compound/{namespace}/JSON
//! - Query value is POSTed as a form field named after the namespace, since
//!   InChI strings do not survive URL paths reliably
//! - Rate Limit: 5 requests/second (PubChem usage policy)

use super::http::{endpoint, RateLimitedClient};
use super::{conversions, declares, ConversionError, ConversionService, HttpSession};
use crate::job::Conversion;
use crate::record::AttributeValue;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

pub const SERVICE_ID: &str = "PubChem";

const PUBCHEM_BASE_URL: &str = "https://pubchem.ncbi.nlm.nih.gov/rest/pug/compound/";

const REQUESTS_PER_SECOND: u32 = 5;

const CONVERSIONS: &[(&str, &str)] = &[
    ("inchi", "inchikey"),
    ("inchi", "iupac_name"),
    ("inchi", "formula"),
    ("inchi", "smiles"),
    ("name", "inchi"),
];

/// PUG REST compound response (only the parts we read)
#[derive(Debug, Deserialize)]
struct CompoundResponse {
    #[serde(rename = "PC_Compounds")]
    compounds: Vec<Compound>,
}

#[derive(Debug, Deserialize)]
struct Compound {
    #[serde(default)]
    props: Vec<Property>,
}

#[derive(Debug, Deserialize)]
struct Property {
    urn: Urn,
    value: PropertyValue,
}

#[derive(Debug, Deserialize)]
struct Urn {
    label: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PropertyValue {
    #[serde(default)]
    sval: Option<String>,
}

/// Property label (and preferred urn name) holding each target attribute
fn property_for(target: &str) -> Option<(&'static str, Option<&'static str>)> {
    match target {
        "inchikey" => Some(("InChIKey", None)),
        "inchi" => Some(("InChI", None)),
        "iupac_name" => Some(("IUPAC Name", Some("Preferred"))),
        "formula" => Some(("Molecular Formula", None)),
        "smiles" => Some(("SMILES", Some("Isomeric"))),
        _ => None,
    }
}

/// Pull property `label` out of a PUG REST compound response body
///
/// With `preferred`, a property whose urn name matches wins over the first
/// property carrying the label.
///
/// A body without `PC_Compounds` (PubChem fault documents included) is an
/// `UnknownResponse`; a compound lacking the property is `DataNotRetrieved`.
fn extract_property(
    body: &str,
    label: &str,
    preferred: Option<&str>,
) -> Result<String, ConversionError> {
    let response: CompoundResponse = serde_json::from_str(body)
        .map_err(|e| ConversionError::UnknownResponse(format!("PubChem: {}", e)))?;

    let compound = response
        .compounds
        .first()
        .ok_or_else(|| ConversionError::UnknownResponse("PubChem: no compounds".to_string()))?;

    let with_label = || {
        compound
            .props
            .iter()
            .filter(move |p| p.urn.label == label)
    };

    let property = preferred
        .and_then(|name| with_label().find(|p| p.urn.name.as_deref() == Some(name)))
        .or_else(|| with_label().next());

    property
        .and_then(|p| p.value.sval.clone())
        .ok_or_else(|| {
            ConversionError::DataNotRetrieved(format!("PubChem: compound has no {}", label))
        })
}

/// PubChem lookup service
pub struct PubChem {
    http: RateLimitedClient,
}

impl PubChem {
    pub fn new(session: &HttpSession) -> Self {
        Self {
            http: RateLimitedClient::new(SERVICE_ID, session, REQUESTS_PER_SECOND),
        }
    }

    /// Query compounds where `namespace` equals `value`, read `target`
    async fn query(
        &self,
        namespace: &str,
        value: &str,
        target: &str,
    ) -> Result<AttributeValue, ConversionError> {
        let (label, preferred) = property_for(target)
            .ok_or_else(|| ConversionError::not_supported(SERVICE_ID, namespace, target))?;

        let url = endpoint(PUBCHEM_BASE_URL, &[namespace, "JSON"])?;
        let fetched = self.http.post_form(url, &[(namespace, value)]).await?;

        debug!(
            service = SERVICE_ID,
            status = %fetched.status,
            namespace,
            target,
            "PubChem responded"
        );

        // PUGREST.NotFound: nothing matched the query
        if fetched.status == StatusCode::NOT_FOUND {
            return Err(ConversionError::DataNotRetrieved(format!(
                "PubChem: no compound for {} {}",
                namespace, value
            )));
        }

        extract_property(&fetched.body, label, preferred).map(AttributeValue::String)
    }
}

#[async_trait]
impl ConversionService for PubChem {
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

        self.query(source, value, target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPOUND: &str = r#"{
        "PC_Compounds": [{
            "props": [
                {"urn": {"label": "IUPAC Name", "name": "Allowed"}, "value": {"sval": "allowed-name"}},
                {"urn": {"label": "IUPAC Name", "name": "Preferred"}, "value": {"sval": "5-(4-fluorophenyl)-3-methyl-1,3-oxazine-2,6-dione"}},
                {"urn": {"label": "InChIKey", "name": "Standard"}, "value": {"sval": "JVGVDSSUAVXRDY-UHFFFAOYSA-N"}},
                {"urn": {"label": "Molecular Formula"}, "value": {"sval": "C11H8FNO3"}},
                {"urn": {"label": "Mass", "name": "Exact"}, "value": {"fval": 221.04}}
            ]
        }]
    }"#;

    #[test]
    fn test_extract_preferred_iupac_name() {
        assert_eq!(
            extract_property(COMPOUND, "IUPAC Name", Some("Preferred")).unwrap(),
            "5-(4-fluorophenyl)-3-methyl-1,3-oxazine-2,6-dione"
        );
    }

    #[test]
    fn test_extract_by_label_without_name() {
        assert_eq!(
            extract_property(COMPOUND, "InChIKey", None).unwrap(),
            "JVGVDSSUAVXRDY-UHFFFAOYSA-N"
        );
        assert_eq!(extract_property(COMPOUND, "Molecular Formula", None).unwrap(), "C11H8FNO3");
    }

    #[test]
    fn test_missing_property_is_data_not_retrieved() {
        let err = extract_property(COMPOUND, "SMILES", Some("Isomeric")).unwrap_err();
        assert!(matches!(err, ConversionError::DataNotRetrieved(_)));
    }

    #[test]
    fn test_fault_document_is_unknown_response() {
        let fault = r#"{"Fault": {"Code": "PUGREST.BadRequest", "Message": "Unable to standardize the given structure"}}"#;
        let err = extract_property(fault, "InChIKey", None).unwrap_err();
        assert!(matches!(err, ConversionError::UnknownResponse(_)));
    }

    #[test]
    fn test_non_json_is_unknown_response() {
        let err = extract_property("<html>busy</html>", "InChIKey", None).unwrap_err();
        assert!(matches!(err, ConversionError::UnknownResponse(_)));
    }

    #[tokio::test]
    async fn test_undeclared_pair_not_supported() {
        let session = HttpSession::connect(&Default::default()).unwrap();
        let service = PubChem::new(&session);

        let err = service.convert("casno", "inchi", "50-00-0").await.unwrap_err();
        assert!(matches!(err, ConversionError::ConversionNotSupported { .. }));
    }

    #[test]
    fn test_capabilities_match_table() {
        let session = HttpSession::connect(&Default::default()).unwrap();
        let caps = PubChem::new(&session).capabilities();
        assert_eq!(caps.len(), CONVERSIONS.len());
        assert!(caps.contains(&Conversion::new("name", "inchi")));
    }
}
