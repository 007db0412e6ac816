//! JSON record store
//!
//! Reads and writes a file holding a JSON array of objects, one object per
//! spectrum. Attribute order inside each object is kept.

use crate::record::Record;
use msme_common::{Error, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Load records from a JSON array file
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let file = File::open(path)?;
    let records: Vec<Record> = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        Error::InvalidInput(format!("{} is not a JSON array of objects: {}", path.display(), e))
    })?;

    info!(path = %path.display(), records = records.len(), "Loaded records");
    Ok(records)
}

/// Write records to `path` as a pretty-printed JSON array
pub fn save_records(path: &Path, records: &[Record]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    info!(path = %path.display(), records = records.len(), "Saved records");
    Ok(())
}
