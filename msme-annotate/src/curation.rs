//! Record curation before annotation
//!
//! Curation is an optional, opaque pre-pass over the whole collection. The
//! default curator only cleans values so lookups are not sent padded or
//! placeholder identifiers.

use crate::record::{AttributeValue, Record};

/// Pure transformation of a record collection
pub trait Curator {
    fn curate(&self, records: Vec<Record>) -> Vec<Record>;
}

/// Placeholder values treated as missing
const PLACEHOLDERS: &[&str] = &["", "NA", "N/A", "n/a", "nan", "NaN", "None", "null"];

/// Trims string values and drops empty or placeholder attributes
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicCurator;

impl BasicCurator {
    fn curate_record(mut record: Record) -> Record {
        record.retain(|_, value| match value {
            AttributeValue::Null => false,
            AttributeValue::String(s) => {
                let trimmed = s.trim();
                if PLACEHOLDERS.iter().any(|p| *p == trimmed) {
                    return false;
                }
                if trimmed.len() != s.len() {
                    *s = trimmed.to_string();
                }
                true
            }
            _ => true,
        });
        record
    }
}

impl Curator for BasicCurator {
    fn curate(&self, records: Vec<Record>) -> Vec<Record> {
        records.into_iter().map(Self::curate_record).collect()
    }
}
