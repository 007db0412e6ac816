//! Batch scheduler
//!
//! Runs the annotator over a record collection:
//! 1. Validate requested services against the catalog (no network yet)
//! 2. Open the shared HTTP session for the whole run
//! 3. Instantiate services and derive the job sequence
//! 4. Annotate contiguous batches one after another, the records of a batch
//!    concurrently
//!
//! Batch size is the only admission control: at most `batch_size` records
//! are in flight at once. Results come back in input order.

use crate::annotator::Annotator;
use crate::diagnostics::{render_summary, Coverage, Diagnostics};
use crate::error::{AnnotateError, AnnotateResult};
use crate::job::{self, Job, JobDescriptor};
use crate::record::Record;
use crate::services::{HttpSession, ServiceCatalog};
use futures::future::join_all;
use msme_common::config::{HttpConfig, DEFAULT_BATCH_SIZE};
use std::time::Instant;
use tracing::{debug, info};

/// Parameters of one annotation run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Service identifiers to instantiate, in registration order
    pub services: Vec<String>,
    /// Explicit jobs; `None` runs every conversion the services declare
    pub jobs: Option<Vec<JobDescriptor>>,
    /// Records annotated concurrently
    pub batch_size: usize,
    /// Keep passing over the jobs while attributes are being added
    pub repeat: bool,
    /// Shared HTTP client settings
    pub http: HttpConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            services: ServiceCatalog::builtin().ids(),
            jobs: None,
            batch_size: DEFAULT_BATCH_SIZE,
            repeat: false,
            http: HttpConfig::default(),
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Annotated records, in input order
    pub records: Vec<Record>,
    /// The job sequence that was applied
    pub jobs: Vec<Job>,
    /// Diagnostics summed over all records
    pub diagnostics: Diagnostics,
    /// Target attribute coverage before and after the run
    pub coverage: Coverage,
}

impl RunResult {
    /// Human-readable run report
    pub fn summary(&self) -> String {
        render_summary(&self.diagnostics, &self.coverage, self.records.len())
    }
}

/// Runs annotation over record collections with services from a catalog
pub struct BatchScheduler {
    catalog: ServiceCatalog,
}

impl BatchScheduler {
    pub fn new(catalog: ServiceCatalog) -> Self {
        Self { catalog }
    }

    /// Annotate `records` according to `config`
    ///
    /// # Errors
    /// - [`AnnotateError::InvalidBatchSize`] for a zero batch size
    /// - [`AnnotateError::UnknownService`] before any connection is opened
    /// - [`AnnotateError::Connection`] if the shared session cannot be built
    /// - [`AnnotateError::MalformedJob`] for unusable job descriptors
    ///
    /// Nothing is annotated when any of these occur. Lookup failures for
    /// individual jobs are not errors; they show up in the diagnostics.
    pub async fn run(&self, records: Vec<Record>, config: &RunConfig) -> AnnotateResult<RunResult> {
        if config.batch_size == 0 {
            return Err(AnnotateError::InvalidBatchSize(config.batch_size));
        }

        self.catalog.validate(&config.services)?;

        // Held for the rest of the run; dropped on every return path
        let session = HttpSession::connect(&config.http)?;

        let registry = self.catalog.instantiate(&config.services, &session)?;
        let jobs = job::normalize(config.jobs.as_deref(), &registry.capability_index())?;
        let annotator = Annotator::new(registry);

        let mut coverage = Coverage::before(&jobs, &records);

        info!(
            records = records.len(),
            jobs = jobs.len(),
            services = ?config.services,
            batch_size = config.batch_size,
            repeat = config.repeat,
            "Starting annotation run"
        );

        let start = Instant::now();
        let (records, diagnostics) =
            annotate_batches(&annotator, records, &jobs, config.batch_size, config.repeat).await;

        coverage.after(&records);

        info!(
            records = records.len(),
            added = diagnostics.total_conversions(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Annotation run completed"
        );

        Ok(RunResult {
            records,
            jobs,
            diagnostics,
            coverage,
        })
    }
}

/// Annotate `records` batch by batch
///
/// Records of one batch run concurrently on the current task; the next batch
/// starts when the whole batch has finished. Output order is input order.
pub async fn annotate_batches(
    annotator: &Annotator,
    records: Vec<Record>,
    jobs: &[Job],
    batch_size: usize,
    repeat: bool,
) -> (Vec<Record>, Diagnostics) {
    let batch_size = batch_size.max(1);
    let total = records.len();
    let batch_count = total.div_ceil(batch_size);

    let mut annotated = Vec::with_capacity(total);
    let mut diagnostics = Diagnostics::new();
    let mut remaining = records.into_iter().peekable();
    let mut batch_index = 0;

    while remaining.peek().is_some() {
        let batch: Vec<Record> = remaining.by_ref().take(batch_size).collect();
        batch_index += 1;

        debug!(
            batch = batch_index,
            batches = batch_count,
            size = batch.len(),
            "Annotating batch"
        );

        let outcomes = join_all(
            batch
                .into_iter()
                .map(|record| annotator.annotate(record, jobs, repeat)),
        )
        .await;

        for outcome in outcomes {
            diagnostics.merge(outcome.diagnostics);
            annotated.push(outcome.record);
        }

        if batch_index % 10 == 0 || batch_index == batch_count {
            info!(
                progress = format!("{}/{}", annotated.len(), total),
                "Annotation progress"
            );
        }
    }

    (annotated, diagnostics)
}
