//! Error types for msme-annotate
//!
//! Run-fatal errors live in [`AnnotateError`]. Per-job lookup failures are
//! [`crate::services::ConversionError`] and never escape a record's
//! annotation.

use thiserror::Error;

/// Errors that abort a run before (or instead of) processing records
#[derive(Debug, Error)]
pub enum AnnotateError {
    /// Requested service identifier has no registered implementation
    #[error("Service {0} unknown")]
    UnknownService(String),

    /// Job descriptor could not be normalized
    #[error("Malformed job {descriptor:?}: {reason}")]
    MalformedJob {
        descriptor: Vec<String>,
        reason: String,
    },

    /// Batch size must be a positive integer
    #[error("Invalid batch size {0}: must be at least 1")]
    InvalidBatchSize(usize),

    /// Shared HTTP connection could not be set up
    #[error("Connection error: {0}")]
    Connection(String),

    /// msme-common error (config, I/O, JSON)
    #[error(transparent)]
    Common(#[from] msme_common::Error),
}

impl AnnotateError {
    pub(crate) fn malformed(descriptor: &[String], reason: impl Into<String>) -> Self {
        Self::MalformedJob {
            descriptor: descriptor.to_vec(),
            reason: reason.into(),
        }
    }
}

/// Result type for run-level operations
pub type AnnotateResult<T> = Result<T, AnnotateError>;
