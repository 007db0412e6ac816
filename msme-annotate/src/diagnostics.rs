//! Annotation diagnostics
//!
//! Counts why jobs were skipped or failed, how often each job succeeded, and
//! how attribute coverage changed over a run. Purely observational: nothing
//! here feeds back into which jobs run.

use crate::job::Job;
use crate::record::Record;
use crate::services::ConversionError;
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

/// Why a job did not write its target attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticKind {
    /// Target attribute already on the record
    AlreadyPresent,
    /// Job names a service with no implementation in the registry
    UnknownService,
    /// Source attribute missing from the record
    MissingSource,
    /// Service rejected the conversion pair
    Unsupported,
    /// Lookup returned no data or an uninterpretable response
    FetchFailed,
}

impl DiagnosticKind {
    pub const ALL: [DiagnosticKind; 5] = [
        DiagnosticKind::AlreadyPresent,
        DiagnosticKind::UnknownService,
        DiagnosticKind::MissingSource,
        DiagnosticKind::Unsupported,
        DiagnosticKind::FetchFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::AlreadyPresent => "already_present",
            DiagnosticKind::UnknownService => "unknown_service",
            DiagnosticKind::MissingSource => "missing_source",
            DiagnosticKind::Unsupported => "unsupported",
            DiagnosticKind::FetchFailed => "fetch_failed",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&ConversionError> for DiagnosticKind {
    fn from(err: &ConversionError) -> Self {
        match err {
            ConversionError::ConversionNotSupported { .. } => DiagnosticKind::Unsupported,
            ConversionError::DataNotRetrieved(_) | ConversionError::UnknownResponse(_) => {
                DiagnosticKind::FetchFailed
            }
        }
    }
}

/// Counters keyed by `(job, kind)`, plus successful conversions per job
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    skips: BTreeMap<(Job, DiagnosticKind), usize>,
    conversions: BTreeMap<Job, usize>,
    records: usize,
    passes: usize,
    max_passes: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_skip(&mut self, job: &Job, kind: DiagnosticKind) {
        *self.skips.entry((job.clone(), kind)).or_insert(0) += 1;
    }

    pub fn record_conversion(&mut self, job: &Job) {
        *self.conversions.entry(job.clone()).or_insert(0) += 1;
    }

    /// Note one finished record annotation that took `passes` passes
    pub fn record_annotation(&mut self, passes: usize) {
        self.records += 1;
        self.passes += passes;
        self.max_passes = self.max_passes.max(passes);
    }

    /// Times `job` was skipped for `kind`
    pub fn count(&self, job: &Job, kind: DiagnosticKind) -> usize {
        self.skips
            .get(&(job.clone(), kind))
            .copied()
            .unwrap_or(0)
    }

    /// Skips of `kind` across all jobs
    pub fn total(&self, kind: DiagnosticKind) -> usize {
        self.skips
            .iter()
            .filter(|((_, k), _)| *k == kind)
            .map(|(_, n)| n)
            .sum()
    }

    /// Successful conversions by `job`
    pub fn conversions(&self, job: &Job) -> usize {
        self.conversions.get(job).copied().unwrap_or(0)
    }

    pub fn total_conversions(&self) -> usize {
        self.conversions.values().sum()
    }

    pub fn records(&self) -> usize {
        self.records
    }

    pub fn total_passes(&self) -> usize {
        self.passes
    }

    /// Most passes any single record needed
    pub fn max_passes(&self) -> usize {
        self.max_passes
    }

    /// `(job, kind, count)` in job order
    pub fn skips(&self) -> impl Iterator<Item = (&Job, DiagnosticKind, usize)> {
        self.skips.iter().map(|((job, kind), n)| (job, *kind, *n))
    }

    /// Fold `other` into `self`
    pub fn merge(&mut self, other: Diagnostics) {
        for (key, n) in other.skips {
            *self.skips.entry(key).or_insert(0) += n;
        }
        for (job, n) in other.conversions {
            *self.conversions.entry(job).or_insert(0) += n;
        }
        self.records += other.records;
        self.passes += other.passes;
        self.max_passes = self.max_passes.max(other.max_passes);
    }
}

/// Records carrying each target attribute before and after a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coverage {
    attributes: BTreeMap<String, (usize, usize)>,
}

impl Coverage {
    /// Start tracking the targets of `jobs`, counting them in `records`
    pub fn before(jobs: &[Job], records: &[Record]) -> Self {
        let mut attributes = BTreeMap::new();
        for job in jobs {
            attributes.entry(job.target.clone()).or_insert_with(|| {
                let present = records.iter().filter(|r| r.contains(&job.target)).count();
                (present, present)
            });
        }
        Self { attributes }
    }

    /// Recount tracked attributes in the annotated `records`
    pub fn after(&mut self, records: &[Record]) {
        for (attribute, (_, after)) in self.attributes.iter_mut() {
            *after = records.iter().filter(|r| r.contains(attribute)).count();
        }
    }

    /// `(before, after)` counts for `attribute`
    pub fn get(&self, attribute: &str) -> Option<(usize, usize)> {
        self.attributes.get(attribute).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize, usize)> {
        self.attributes
            .iter()
            .map(|(name, (before, after))| (name.as_str(), *before, *after))
    }
}

/// Human-readable report of a run's diagnostics and coverage
pub fn render_summary(diagnostics: &Diagnostics, coverage: &Coverage, total_records: usize) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Annotated {} records: {} attributes added, {} passes (max {} per record)",
        diagnostics.records(),
        diagnostics.total_conversions(),
        diagnostics.total_passes(),
        diagnostics.max_passes()
    );

    let _ = writeln!(out, "Coverage:");
    for (attribute, before, after) in coverage.iter() {
        let _ = writeln!(
            out,
            "  {:<12} {} -> {} of {} (+{})",
            attribute,
            before,
            after,
            total_records,
            after.saturating_sub(before)
        );
    }

    let _ = writeln!(out, "Skips:");
    for kind in DiagnosticKind::ALL {
        let total = diagnostics.total(kind);
        if total > 0 {
            let _ = writeln!(out, "  {:<16} {}", kind.as_str(), total);
        }
    }

    out
}
