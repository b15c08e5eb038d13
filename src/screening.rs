//! Candidate screening by descriptor windows
//!
//! Screens a predicted-candidate table through tiers of inclusive bounds,
//! from a strict synthesis-ready window down to a broad recall tier. Each
//! tier is independent: a candidate can appear in several outputs.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{MofcapError, Result};

/// Inclusive bound on one column; `None` leaves that side open
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Bound {
    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        if let Some(min) = self.min {
            if value < min {
                return false;
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return false;
            }
        }
        true
    }
}

/// One named screening tier: a set of per-column bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenTier {
    pub name: String,
    pub bounds: Vec<(String, Bound)>,
}

impl ScreenTier {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            bounds: Vec::new(),
        }
    }

    pub fn with_bound(mut self, column: &str, bound: Bound) -> Self {
        self.bounds.push((column.to_string(), bound));
        self
    }
}

/// The three reference tiers.
///
/// `strict` demands both capacities plus a synthesis-friendly descriptor
/// window; `balanced` relaxes the volumetric floor and drops the
/// descriptor window; `broad` keeps only loose capacity floors.
pub fn default_tiers() -> Vec<ScreenTier> {
    vec![
        ScreenTier::new("strict")
            .with_bound("usablegc", Bound::at_least(5.5))
            .with_bound("usablevc", Bound::at_least(0.040))
            .with_bound("density", Bound::between(0.3, 3.0))
            .with_bound("porosity", Bound::between(0.3, 0.9))
            .with_bound("Ri", Bound::between(5.0, 15.0))
            .with_bound("SSA", Bound::between(4000.0, 6000.0))
            .with_bound("SPV", Bound::between(1.0, 2.0)),
        ScreenTier::new("balanced")
            .with_bound("usablegc", Bound::at_least(5.5))
            .with_bound("usablevc", Bound::at_least(0.020)),
        ScreenTier::new("broad")
            .with_bound("usablegc", Bound::at_least(0.5))
            .with_bound("usablevc", Bound::at_least(0.020)),
    ]
}

/// Rows of `df` passing every bound of the tier.
///
/// Rows with a null or non-finite value in a bounded column never pass.
pub fn apply_tier(df: &DataFrame, tier: &ScreenTier) -> Result<DataFrame> {
    let mut keep = vec![true; df.height()];
    for (column, bound) in &tier.bounds {
        let col = df
            .column(column)
            .map_err(|_| MofcapError::ColumnNotFound(column.clone()))?;
        let ca = col.cast(&DataType::Float64)?;
        for (i, value) in ca.f64()?.into_iter().enumerate() {
            let passes = match value {
                Some(v) if v.is_finite() => bound.contains(v),
                _ => false,
            };
            if !passes {
                keep[i] = false;
            }
        }
    }

    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    let filtered = df.filter(&mask)?;
    info!(
        tier = %tier.name,
        kept = filtered.height(),
        total = df.height(),
        "screening tier applied"
    );
    Ok(filtered)
}
