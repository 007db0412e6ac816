//! Job model and job normalization
//!
//! A [`Job`] is one possible conversion: read `source` from a record, ask
//! `service` to convert it, store the result as `target`. Jobs are plain data;
//! the annotator decides at run time whether a job can fire.

use crate::error::{AnnotateError, AnnotateResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One declared conversion `(source, target, service)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Job {
    pub source: String,
    pub target: String,
    pub service: String,
}

impl Job {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            service: service.into(),
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.source, self.target, self.service)
    }
}

/// A `(source, target)` pair a service declares it can convert
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Conversion {
    pub source: String,
    pub target: String,
}

impl Conversion {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn matches(&self, source: &str, target: &str) -> bool {
        self.source == source && self.target == target
    }
}

/// Capability sets of all registered services, in registration order
#[derive(Debug, Clone, Default)]
pub struct CapabilityIndex {
    entries: Vec<(String, Vec<Conversion>)>,
}

impl CapabilityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a service's capability set
    pub fn register(&mut self, service: impl Into<String>, conversions: Vec<Conversion>) {
        self.entries.push((service.into(), conversions));
    }

    /// Service identifiers supporting `source -> target`, in registration order
    pub fn services_supporting<'a>(
        &'a self,
        source: &'a str,
        target: &'a str,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(_, conversions)| conversions.iter().any(|c| c.matches(source, target)))
            .map(|(service, _)| service.as_str())
    }

    /// Every declared conversion as a job: registration order, then
    /// declaration order within a service
    pub fn all_jobs(&self) -> Vec<Job> {
        self.entries
            .iter()
            .flat_map(|(service, conversions)| {
                conversions
                    .iter()
                    .map(move |c| Job::new(&c.source, &c.target, service))
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Raw job descriptor as given by a user
///
/// `[source, target, service]` names the service explicitly; `[source, target]`
/// is resolved against the capability index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobDescriptor(pub Vec<String>);

impl JobDescriptor {
    /// Parse the command-line form `source:target[:service]`
    pub fn parse(text: &str) -> Self {
        Self(text.split(':').map(|part| part.trim().to_string()).collect())
    }
}

impl From<Job> for JobDescriptor {
    fn from(job: Job) -> Self {
        Self(vec![job.source, job.target, job.service])
    }
}

/// Turn raw descriptors into a job sequence
///
/// With no descriptors (absent or empty) every conversion in `index` becomes a
/// job. Otherwise descriptors keep their order; a pair expands to one job per
/// service supporting it.
///
/// # Errors
/// [`AnnotateError::MalformedJob`] for a descriptor with the wrong number of
/// parts, an empty part, or a pair no registered service supports.
pub fn normalize(
    raw: Option<&[JobDescriptor]>,
    index: &CapabilityIndex,
) -> AnnotateResult<Vec<Job>> {
    let descriptors = match raw {
        Some(descriptors) if !descriptors.is_empty() => descriptors,
        _ => return Ok(index.all_jobs()),
    };

    let mut jobs = Vec::with_capacity(descriptors.len());

    for JobDescriptor(parts) in descriptors {
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(AnnotateError::malformed(parts, "empty field"));
        }

        match parts.as_slice() {
            [source, target, service] => jobs.push(Job::new(source, target, service)),
            [source, target] => {
                let before = jobs.len();
                jobs.extend(
                    index
                        .services_supporting(source, target)
                        .map(|service| Job::new(source, target, service)),
                );
                if jobs.len() == before {
                    return Err(AnnotateError::malformed(
                        parts,
                        "no registered service supports this conversion",
                    ));
                }
            }
            _ => {
                return Err(AnnotateError::malformed(
                    parts,
                    "expected [source, target] or [source, target, service]",
                ))
            }
        }
    }

    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> CapabilityIndex {
        let mut index = CapabilityIndex::new();
        index.register(
            "PubChem",
            vec![
                Conversion::new("inchi", "inchikey"),
                Conversion::new("name", "inchi"),
            ],
        );
        index.register(
            "CTS",
            vec![
                Conversion::new("name", "inchikey"),
                Conversion::new("inchi", "inchikey"),
            ],
        );
        index
    }

    fn descriptor(parts: &[&str]) -> JobDescriptor {
        JobDescriptor(parts.iter().map(|p| p.to_string()).collect())
    }

    #[test]
    fn test_absent_jobs_use_all_conversions_in_registration_order() {
        let jobs = normalize(None, &index()).unwrap();
        assert_eq!(
            jobs,
            vec![
                Job::new("inchi", "inchikey", "PubChem"),
                Job::new("name", "inchi", "PubChem"),
                Job::new("name", "inchikey", "CTS"),
                Job::new("inchi", "inchikey", "CTS"),
            ]
        );
    }

    #[test]
    fn test_empty_jobs_behave_like_absent() {
        let jobs = normalize(Some(&[][..]), &index()).unwrap();
        assert_eq!(jobs.len(), 4);
    }

    #[test]
    fn test_triples_kept_verbatim() {
        let raw = vec![descriptor(&["casno", "inchikey", "Unregistered"])];
        let jobs = normalize(Some(raw.as_slice()), &index()).unwrap();
        assert_eq!(jobs, vec![Job::new("casno", "inchikey", "Unregistered")]);
    }

    #[test]
    fn test_pair_expands_to_every_supporting_service() {
        let raw = vec![descriptor(&["inchi", "inchikey"])];
        let jobs = normalize(Some(raw.as_slice()), &index()).unwrap();
        assert_eq!(
            jobs,
            vec![
                Job::new("inchi", "inchikey", "PubChem"),
                Job::new("inchi", "inchikey", "CTS"),
            ]
        );
    }

    #[test]
    fn test_unsupported_pair_is_malformed() {
        let raw = vec![descriptor(&["smiles", "casno"])];
        let err = normalize(Some(raw.as_slice()), &index()).unwrap_err();
        assert!(matches!(err, AnnotateError::MalformedJob { .. }));
    }

    #[test]
    fn test_wrong_arity_is_malformed() {
        for parts in [&["name"][..], &["a", "b", "c", "d"][..]] {
            let raw = vec![descriptor(parts)];
            let err = normalize(Some(raw.as_slice()), &index()).unwrap_err();
            assert!(matches!(err, AnnotateError::MalformedJob { .. }));
        }
    }

    #[test]
    fn test_empty_field_is_malformed() {
        let raw = vec![descriptor(&["name", "", "PubChem"])];
        assert!(normalize(Some(raw.as_slice()), &index()).is_err());
    }

    #[test]
    fn test_parse_command_line_form() {
        assert_eq!(
            JobDescriptor::parse("name:inchi:PubChem"),
            descriptor(&["name", "inchi", "PubChem"])
        );
        assert_eq!(
            JobDescriptor::parse(" inchi : smiles "),
            descriptor(&["inchi", "smiles"])
        );
    }
}
