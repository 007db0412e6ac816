//! Fixpoint annotation of a single record
//!
//! Jobs are applied in sequence order, pass after pass. A pass that writes at
//! least one attribute triggers another pass when `repeat` is set; the loop
//! stops after the first pass that writes nothing. Since a target is never
//! overwritten, every job writes at most once, so a record needs at most
//! `jobs.len() + 1` passes.
//!
//! Every job is re-evaluated on each pass, including jobs whose lookup failed
//! earlier, so a failing lookup is repeated once per extra pass.

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::job::Job;
use crate::record::Record;
use crate::services::{ConversionError, ServiceRegistry};
use tracing::{debug, trace, warn};

/// Result of annotating one record
#[derive(Debug, Clone)]
pub struct Annotation {
    /// The record with any attributes found added
    pub record: Record,
    /// Skips, failures and conversions for this record only
    pub diagnostics: Diagnostics,
    /// Passes over the job sequence
    pub passes: usize,
}

/// Applies job sequences to records using one run's service registry
#[derive(Clone)]
pub struct Annotator {
    registry: ServiceRegistry,
}

impl Annotator {
    pub fn new(registry: ServiceRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Annotate `record` with `jobs` until no job adds anything
    ///
    /// With `repeat == false` exactly one pass runs, so a job whose source is
    /// produced by a job later in the same pass stays unresolved.
    ///
    /// Conversion failures never escape: they are counted in the returned
    /// diagnostics and the next job runs.
    pub async fn annotate(&self, mut record: Record, jobs: &[Job], repeat: bool) -> Annotation {
        let mut diagnostics = Diagnostics::new();
        let mut passes = 0;
        let mut progress = true;

        while progress {
            progress = false;
            passes += 1;

            for job in jobs {
                match self.apply(&mut record, job).await {
                    Ok(()) => {
                        diagnostics.record_conversion(job);
                        if repeat {
                            progress = true;
                        }
                    }
                    Err(kind) => diagnostics.record_skip(job, kind),
                }
            }

            trace!(pass = passes, progress, "Annotation pass finished");
        }

        diagnostics.record_annotation(passes);

        Annotation {
            record,
            diagnostics,
            passes,
        }
    }

    /// Run one job against `record`
    ///
    /// Returns the reason when the job wrote nothing.
    async fn apply(&self, record: &mut Record, job: &Job) -> Result<(), DiagnosticKind> {
        if record.contains(&job.target) {
            return Err(DiagnosticKind::AlreadyPresent);
        }

        let service = self.registry.get(&job.service).ok_or_else(|| {
            debug!(service = %job.service, "Job skipped: service not in registry");
            DiagnosticKind::UnknownService
        })?;

        let value = record
            .text(&job.source)
            .ok_or(DiagnosticKind::MissingSource)?;

        match service.convert(&job.source, &job.target, &value).await {
            Ok(result) => {
                debug!(
                    service = %job.service,
                    source = %job.source,
                    target = %job.target,
                    "Attribute added"
                );
                record.insert_if_absent(job.target.clone(), result);
                Ok(())
            }
            Err(e) => {
                match &e {
                    ConversionError::UnknownResponse(_) => warn!(
                        service = %job.service,
                        source = %job.source,
                        target = %job.target,
                        error = %e,
                        "Lookup returned an unexpected response"
                    ),
                    _ => debug!(
                        service = %job.service,
                        source = %job.source,
                        target = %job.target,
                        error = %e,
                        "Lookup failed"
                    ),
                }
                Err(DiagnosticKind::from(&e))
            }
        }
    }
}
