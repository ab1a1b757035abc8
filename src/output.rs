//! Output formatting and persistence for the derived tables.
//!
//! Supports debug logging, CSV tables and a JSON document of a whole run.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::pipeline::{AnalysisOutput, RunOutput, RunSummary};
use csv::WriterBuilder;
use std::fmt::Debug;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

pub const HOUSING_UNITS_FILE: &str = "housing_units_by_year.csv";
pub const PRICES_BY_YEAR_FILE: &str = "prices_square_foot_by_year.csv";
pub const PRICES_BY_NEIGHBORHOOD_FILE: &str = "prices_by_year_by_neighborhood.csv";
pub const ALL_NEIGHBORHOODS_FILE: &str = "all_neighborhoods.csv";
pub const ANALYSIS_FILE: &str = "analysis.json";

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty<T: Debug>(value: &T) {
    debug!("{:#?}", value);
}

/// Writes `rows` to a new CSV file at `path`, replacing any existing file.
///
/// The header comes from the first row's field names, so an empty table
/// produces an empty file. Missing values are written as empty cells.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    debug!(path = %path.display(), rows = rows.len(), "Writing CSV table");

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Document written to `analysis.json`.
#[derive(Serialize)]
struct AnalysisDocument<'a> {
    summary: RunSummary,
    #[serde(flatten)]
    analysis: &'a AnalysisOutput,
}

/// Writes `value` as pretty-printed JSON to `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    debug!(path = %path.display(), "Writing JSON document");
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

/// Writes every derived table as CSV plus the whole run as JSON into `dir`.
///
/// Creates `dir` if needed and returns the written paths.
#[tracing::instrument(skip(run), fields(dir = %dir.display()))]
pub fn export_all(dir: &Path, run: &RunOutput) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let analysis = &run.analysis;

    let files = [
        HOUSING_UNITS_FILE,
        PRICES_BY_YEAR_FILE,
        PRICES_BY_NEIGHBORHOOD_FILE,
        ALL_NEIGHBORHOODS_FILE,
        ANALYSIS_FILE,
    ]
    .map(|name| dir.join(name));

    write_csv(&files[0], &analysis.housing_units_by_year)?;
    write_csv(&files[1], &analysis.prices_square_foot_by_year)?;
    write_csv(&files[2], &analysis.prices_by_year_by_neighborhood)?;
    write_csv(&files[3], &analysis.all_neighborhoods)?;
    write_json(
        &files[4],
        &AnalysisDocument {
            summary: run.summary(),
            analysis,
        },
    )?;

    info!(files = files.len(), "Export complete");
    Ok(files.to_vec())
}
