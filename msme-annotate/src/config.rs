//! Run settings resolution for msme-annotate
//!
//! **Priority:** command line → environment → TOML → built-in defaults
//!
//! Command line and environment are merged by clap (`env = ...` on each
//! argument), so by the time [`resolve_run_config`] runs, a `Some` in [`Cli`]
//! means one of the two upper tiers set it.

use crate::job::JobDescriptor;
use crate::scheduler::RunConfig;
use crate::services::ServiceCatalog;
use clap::Parser;
use msme_common::config::{LoggingConfig, TomlConfig, DEFAULT_BATCH_SIZE};
use std::path::PathBuf;

/// Annotate spectra metadata with identifiers from chemical lookup services
#[derive(Debug, Clone, Parser)]
#[command(name = "msme-annotate", version, about)]
pub struct Cli {
    /// JSON file holding an array of spectrum metadata objects
    #[arg(short, long)]
    pub input: PathBuf,

    /// Where to write the annotated records
    #[arg(short, long)]
    pub output: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Services to use, comma separated (PubChem, CIR, CTS, NLM)
    #[arg(long, env = "MSME_SERVICES", value_delimiter = ',')]
    pub services: Vec<String>,

    /// Job as source:target[:service]; repeatable. Default: every conversion
    #[arg(short, long = "job")]
    pub jobs: Vec<String>,

    /// Records annotated concurrently
    #[arg(short, long, env = "MSME_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Keep re-running all jobs while new attributes are found
    #[arg(
        short,
        long,
        env = "MSME_REPEAT",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub repeat: Option<bool>,

    /// Run a single pass even if the config file enables repeat
    #[arg(long)]
    pub no_repeat: bool,

    /// Clean records (trim values, drop placeholders) before annotating
    #[arg(long)]
    pub curate: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "MSME_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log file (default: stderr)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Merge command-line/environment settings over TOML and defaults
pub fn resolve_run_config(cli: &Cli, toml: &TomlConfig) -> RunConfig {
    let services = if !cli.services.is_empty() {
        cli.services.clone()
    } else {
        toml.services
            .clone()
            .unwrap_or_else(|| ServiceCatalog::builtin().ids())
    };

    let jobs = if !cli.jobs.is_empty() {
        Some(cli.jobs.iter().map(|j| JobDescriptor::parse(j)).collect())
    } else {
        toml.jobs
            .as_ref()
            .map(|jobs| jobs.iter().cloned().map(JobDescriptor).collect())
    };

    RunConfig {
        services,
        jobs,
        batch_size: cli
            .batch_size
            .or(toml.batch_size)
            .unwrap_or(DEFAULT_BATCH_SIZE),
        repeat: repeat_setting(cli)
            .or(toml.repeat)
            .unwrap_or(false),
        http: toml.http.clone(),
    }
}

/// `--no-repeat` wins over `--repeat` and `MSME_REPEAT`
fn repeat_setting(cli: &Cli) -> Option<bool> {
    if cli.no_repeat {
        Some(false)
    } else {
        cli.repeat
    }
}

/// Logging settings with command-line/environment overrides applied
pub fn resolve_logging(cli: &Cli, toml: &TomlConfig) -> LoggingConfig {
    LoggingConfig {
        level: cli
            .log_level
            .clone()
            .unwrap_or_else(|| toml.logging.level.clone()),
        file: cli.log_file.clone().or_else(|| toml.logging.file.clone()),
    }
}
