//! File readers for sorbent tables
//!
//! The reference capacity tables ship as whitespace-delimited `.dat` files
//! with a fixed metadata preamble, which CSV readers cannot split reliably.
//! [`read_dat`] parses them line by line; [`read_csv`] covers ordinary
//! comma-separated tables such as screening candidate lists.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use polars::prelude::*;
use tracing::{debug, warn};

use crate::error::{MofcapError, Result};

use super::{FEATURE_COLUMNS, ID_COLUMN, TARGET_COLUMNS};

/// Metadata lines before the data block in reference `.dat` files
pub const METADATA_ROWS: usize = 4;

/// Raw parse result before schema validation
#[derive(Debug, Clone)]
pub struct RawTable {
    pub frame: DataFrame,
    /// Lines skipped because a field failed to parse as a number
    pub dropped_rows: usize,
}

/// Read a whitespace-delimited capacity table, skipping the standard preamble.
///
/// Expected field order per row:
/// `name usablegc usablevc density porosity Ri SSA SPV`.
/// Rows with missing fields or unparseable numbers are dropped and counted.
pub fn read_dat(path: &Path) -> Result<RawTable> {
    read_dat_with_skip(path, METADATA_ROWS)
}

pub fn read_dat_with_skip(path: &Path, skip_rows: usize) -> Result<RawTable> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let n_numeric = TARGET_COLUMNS.len() + FEATURE_COLUMNS.len();
    let mut names: Vec<String> = Vec::new();
    let mut numeric: Vec<Vec<f64>> = vec![Vec::new(); n_numeric];
    let mut dropped = 0usize;

    for (line_idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line_idx < skip_rows {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() < 1 + n_numeric {
            debug!(line = line_idx + 1, "short row dropped");
            dropped += 1;
            continue;
        }

        let parsed: std::result::Result<Vec<f64>, _> = fields[1..=n_numeric]
            .iter()
            .map(|f| f.parse::<f64>())
            .collect();
        match parsed {
            Ok(values) => {
                names.push(fields[0].to_string());
                for (column, value) in numeric.iter_mut().zip(values) {
                    column.push(value);
                }
            }
            Err(_) => {
                debug!(line = line_idx + 1, "unparseable row dropped");
                dropped += 1;
            }
        }
    }

    if names.is_empty() {
        return Err(MofcapError::DataError(format!(
            "no data rows in {}",
            path.display()
        )));
    }
    if dropped > 0 {
        warn!(dropped, path = %path.display(), "dropped unparseable rows");
    }

    let mut columns = vec![Column::new(ID_COLUMN.into(), names)];
    for (name, values) in TARGET_COLUMNS
        .iter()
        .chain(FEATURE_COLUMNS.iter())
        .zip(numeric)
    {
        columns.push(Column::new((*name).into(), values));
    }
    let frame = DataFrame::new(columns)?;

    Ok(RawTable {
        frame,
        dropped_rows: dropped,
    })
}

/// Read a comma-separated table with a header row.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}
