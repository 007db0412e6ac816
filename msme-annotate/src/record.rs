//! Spectrum metadata record
//!
//! An open, ordered attribute map. Attributes keep their insertion order so a
//! record written back to disk lists original attributes first, then the ones
//! added during annotation in the order they were found.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Attribute value (usually a string, any JSON value is accepted)
pub type AttributeValue = Value;

/// One spectrum's metadata
///
/// The annotation engine only adds attributes, through
/// [`Record::insert_if_absent`]. [`Record::retain`] is for curation, which
/// runs before annotation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    attributes: IndexMap<String, AttributeValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `name`, if present
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Value of `name` rendered as text for a lookup query
    ///
    /// Strings are returned as-is; other JSON values use their JSON text.
    /// `null` counts as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        match self.attributes.get(name)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set `name` unless it is already present
    ///
    /// Returns `true` when the attribute was added.
    pub fn insert_if_absent(&mut self, name: impl Into<String>, value: AttributeValue) -> bool {
        use indexmap::map::Entry;

        match self.attributes.entry(name.into()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    /// Keep only attributes matching `keep`
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&String, &mut AttributeValue) -> bool,
    {
        self.attributes.retain(keep);
    }

    /// Attribute names in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, AttributeValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, AttributeValue)>>(iter: I) -> Self {
        Self {
            attributes: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_if_absent_keeps_first_value() {
        let mut record = Record::new();
        assert!(record.insert_if_absent("inchikey", json!("AAA")));
        assert!(!record.insert_if_absent("inchikey", json!("BBB")));
        assert_eq!(record.get("inchikey"), Some(&json!("AAA")));
    }

    #[test]
    fn test_text_renders_non_strings() {
        let record: Record = [
            ("name", json!("caffeine")),
            ("charge", json!(1)),
            ("smiles", Value::Null),
        ]
        .into_iter()
        .collect();

        assert_eq!(record.text("name").as_deref(), Some("caffeine"));
        assert_eq!(record.text("charge").as_deref(), Some("1"));
        assert_eq!(record.text("smiles"), None);
        assert_eq!(record.text("formula"), None);
    }

    #[test]
    fn test_json_preserves_attribute_order() {
        let record: Record =
            serde_json::from_str(r#"{"name": "x", "casno": "50-00-0", "formula": "CH2O"}"#)
                .unwrap();
        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["name", "casno", "formula"]);
    }
}
