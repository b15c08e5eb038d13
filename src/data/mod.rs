//! Dataset schema and tabular access
//!
//! Sorbent tables carry one row per structure: an id column, two usable
//! capacity targets, and five structural descriptors. [`Dataset`] wraps a
//! validated `DataFrame` and hands out `ndarray` views for modeling.

pub mod loader;

pub use loader::{read_csv, read_dat, RawTable};

use std::collections::HashSet;

use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{MofcapError, Result};

/// Structure identifier column
pub const ID_COLUMN: &str = "name";

/// Usable capacity targets: gravimetric, then volumetric
pub const TARGET_COLUMNS: [&str; 2] = ["usablegc", "usablevc"];

/// Structural descriptors used as model inputs
pub const FEATURE_COLUMNS: [&str; 5] = ["density", "porosity", "Ri", "SSA", "SPV"];

/// Which usable capacity a model predicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    Gravimetric,
    Volumetric,
}

impl TargetKind {
    /// Column name in the dataset
    pub fn column(&self) -> &'static str {
        match self {
            TargetKind::Gravimetric => "usablegc",
            TargetKind::Volumetric => "usablevc",
        }
    }

    /// Short key used in artifact column names
    pub fn short_key(&self) -> &'static str {
        match self {
            TargetKind::Gravimetric => "ugc",
            TargetKind::Volumetric => "uvc",
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// A validated sorbent table.
///
/// Construction guarantees: all schema columns present, targets and
/// descriptors are finite f64, ids are unique, at least one row.
#[derive(Debug, Clone)]
pub struct Dataset {
    df: DataFrame,
}

impl Dataset {
    pub fn from_dataframe(df: DataFrame) -> Result<Self> {
        let mut df = df;

        for name in std::iter::once(&ID_COLUMN)
            .chain(TARGET_COLUMNS.iter())
            .chain(FEATURE_COLUMNS.iter())
        {
            if df.column(name).is_err() {
                return Err(MofcapError::ColumnNotFound(name.to_string()));
            }
        }

        let ids = df.column(ID_COLUMN)?.cast(&DataType::String)?;
        df.with_column(ids)?;
        for name in TARGET_COLUMNS.iter().chain(FEATURE_COLUMNS.iter()) {
            let casted = df.column(name)?.cast(&DataType::Float64)?;
            df.with_column(casted)?;
        }

        // rows with missing or non-finite numeric values are unusable
        let mut keep = vec![true; df.height()];
        for name in TARGET_COLUMNS.iter().chain(FEATURE_COLUMNS.iter()) {
            let ca = df.column(name)?.f64()?;
            for (i, v) in ca.into_iter().enumerate() {
                if !v.is_some_and(f64::is_finite) {
                    keep[i] = false;
                }
            }
        }
        if keep.iter().any(|k| !k) {
            let mask = BooleanChunked::from_slice("keep".into(), &keep);
            df = df.filter(&mask)?;
        }

        if df.height() == 0 {
            return Err(MofcapError::DataError(
                "no valid rows after cleaning".to_string(),
            ));
        }

        let ids = df.column(ID_COLUMN)?.str()?;
        let mut seen = HashSet::with_capacity(df.height());
        for id in ids.into_iter().flatten() {
            if !seen.insert(id) {
                return Err(MofcapError::DataError(format!("duplicate sample id: {id}")));
            }
        }

        Ok(Self { df })
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn ids(&self) -> Result<Vec<String>> {
        let ca = self.df.column(ID_COLUMN)?.str()?;
        ca.into_iter()
            .map(|v| {
                v.map(str::to_string)
                    .ok_or_else(|| MofcapError::DataError("null sample id".to_string()))
            })
            .collect()
    }

    /// Descriptor matrix, rows in table order.
    pub fn feature_matrix(&self) -> Result<Array2<f64>> {
        columns_to_array2(&self.df, &FEATURE_COLUMNS)
    }

    pub fn target(&self, kind: TargetKind) -> Result<Array1<f64>> {
        column_f64(&self.df, kind.column())
    }

    /// Row subset by position. Indices must be in range.
    pub fn take(&self, indices: &[usize]) -> Result<Dataset> {
        let idx: Vec<IdxSize> = indices.iter().map(|&i| i as IdxSize).collect();
        let idx = IdxCa::from_vec("idx".into(), idx);
        Ok(Dataset {
            df: self.df.take(&idx)?,
        })
    }
}

/// Extract columns as a row-major f64 matrix.
pub(crate) fn columns_to_array2(df: &DataFrame, col_names: &[&str]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let mut col_values: Vec<Vec<f64>> = Vec::with_capacity(col_names.len());
    for &name in col_names {
        let col = df
            .column(name)
            .map_err(|_| MofcapError::ColumnNotFound(name.to_string()))?;
        let casted = col.cast(&DataType::Float64)?;
        let values: Vec<f64> = casted
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        col_values.push(values);
    }
    Ok(Array2::from_shape_fn((n_rows, col_names.len()), |(r, c)| {
        col_values[c][r]
    }))
}

pub(crate) fn column_f64(df: &DataFrame, name: &str) -> Result<Array1<f64>> {
    let col = df
        .column(name)
        .map_err(|_| MofcapError::ColumnNotFound(name.to_string()))?;
    let casted = col.cast(&DataType::Float64)?;
    Ok(casted
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}
