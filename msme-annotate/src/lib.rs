//! msme-annotate library interface
//!
//! Annotates mass spectrometry metadata records with chemical identifiers
//! (InChI, InChIKey, SMILES, CAS number, formula, names) looked up from
//! remote services. Exposed as a library for the binary and for integration
//! testing.

pub mod annotator;
pub mod config;
pub mod curation;
pub mod diagnostics;
pub mod error;
pub mod job;
pub mod record;
pub mod scheduler;
pub mod services;
pub mod store;

pub use crate::annotator::{Annotation, Annotator};
pub use crate::diagnostics::{DiagnosticKind, Diagnostics};
pub use crate::error::{AnnotateError, AnnotateResult};
pub use crate::job::{Job, JobDescriptor};
pub use crate::record::{AttributeValue, Record};
pub use crate::scheduler::{BatchScheduler, RunConfig, RunResult};
