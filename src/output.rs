//! Output formatting and persistence for population series.
//!
//! Supports pretty-printing, JSON logging, and CSV export (plain or gzip).

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fmt::Debug;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::api::PopulationData;

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty(value: &impl Debug) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes `data` as CSV into any writer, header first.
///
/// Columns are `country,year,population,growth_rate`; a missing growth rate
/// is written as an empty field.
pub fn write_csv<W: Write>(writer: W, data: &[PopulationData]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);

    // serialize() only emits headers on the first record, so an empty series
    // would otherwise produce an empty file.
    if data.is_empty() {
        writer.write_record(["country", "year", "population", "growth_rate"])?;
    }
    for row in data {
        writer.serialize(row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Renders `data` to an in-memory CSV body.
pub fn to_csv_bytes(data: &[PopulationData]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(&mut buf, data)?;
    Ok(buf)
}

/// Exports `data` to a CSV file at `path`, replacing any existing file.
pub fn export_to_csv(path: impl AsRef<Path>, data: &[PopulationData]) -> Result<()> {
    let path = path.as_ref();
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_csv(file, data)?;

    info!(path = %path.display(), rows = data.len(), "Exported population data");
    Ok(())
}

/// Same as [`export_to_csv`], gzip-compressed.
pub fn export_to_csv_gz(path: impl AsRef<Path>, data: &[PopulationData]) -> Result<()> {
    let path = path.as_ref();
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;

    let mut encoder = GzEncoder::new(file, Compression::default());
    write_csv(&mut encoder, data)?;
    encoder.finish()?;

    info!(path = %path.display(), rows = data.len(), "Exported gzip population data");
    Ok(())
}
