//! msme-annotate - spectra metadata annotation
//!
//! Loads a JSON array of spectrum metadata records, fills in missing chemical
//! identifiers from lookup services and writes the annotated records back out.
//!
//! ```text
//! msme-annotate -i spectra.json -o annotated.json --services PubChem,CIR --repeat
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use msme_annotate::config::{resolve_logging, resolve_run_config, Cli};
use msme_annotate::curation::{BasicCurator, Curator};
use msme_annotate::services::ServiceCatalog;
use msme_annotate::{store, BatchScheduler};
use msme_common::config::{load_or_default, resolve_config_path, LoggingConfig};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config.as_deref());
    let toml_config = load_or_default(config_path.as_deref())
        .context("Failed to load configuration")?;

    init_logging(&resolve_logging(&cli, &toml_config))?;

    info!("Starting msme-annotate {}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("Config file: {}", path.display());
    }

    let run_config = resolve_run_config(&cli, &toml_config);

    let mut records = store::load_records(&cli.input)
        .with_context(|| format!("Failed to load records from {}", cli.input.display()))?;

    if cli.curate {
        records = BasicCurator.curate(records);
        info!("Curated {} records", records.len());
    }

    let scheduler = BatchScheduler::new(ServiceCatalog::builtin());
    let result = scheduler
        .run(records, &run_config)
        .await
        .context("Annotation run failed")?;

    store::save_records(&cli.output, &result.records)
        .with_context(|| format!("Failed to write records to {}", cli.output.display()))?;

    println!("{}", result.summary());
    Ok(())
}

/// Install the global subscriber
///
/// `RUST_LOG` wins over the configured level when set. Output goes to the
/// configured file, or stderr when there is none.
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .with_context(|| format!("Invalid log level: {}", logging.level))?;

    let file_layer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let stderr_layer = file_layer
        .is_none()
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Ok(())
}
