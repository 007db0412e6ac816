//! # MSME Common Library
//!
//! Shared code for the MSME annotation tools:
//! - Error and result types
//! - TOML configuration schema and loading
//! - Configuration file resolution

pub mod config;
pub mod error;

pub use error::{Error, Result};
