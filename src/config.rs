//! Experiment configuration

use serde::{Deserialize, Serialize};

use crate::data::TargetKind;
use crate::error::{MofcapError, Result};
use crate::models::{ForestGrid, LassoGrid, RidgeGrid, SearchGrid};

/// One model to search, fit and evaluate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Key used in artifact names, e.g. `bootstrap_ridge.csv`
    pub name: String,
    pub target: TargetKind,
    pub grid: SearchGrid,
}

/// Full experiment configuration.
///
/// `Default` reproduces the reference study: a 70/30 split at seed 42,
/// 5-bin joint stratification, 5-fold search, and a 1000-replicate
/// bootstrap at the 95% level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub test_fraction: f64,
    pub seed: u64,
    pub max_bins: usize,
    pub cv_folds: usize,
    pub n_resamples: usize,
    pub alpha: f64,
    pub roster: Vec<ModelSpec>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.3,
            seed: 42,
            max_bins: 5,
            cv_folds: 5,
            n_resamples: 1000,
            alpha: 0.05,
            roster: default_roster(),
        }
    }
}

/// Ridge and forest on the gravimetric target, lasso on the volumetric.
pub fn default_roster() -> Vec<ModelSpec> {
    vec![
        ModelSpec {
            name: "ridge".to_string(),
            target: TargetKind::Gravimetric,
            grid: SearchGrid::Ridge(RidgeGrid::default()),
        },
        ModelSpec {
            name: "lasso".to_string(),
            target: TargetKind::Volumetric,
            grid: SearchGrid::Lasso(LassoGrid::default()),
        },
        ModelSpec {
            name: "rf".to_string(),
            target: TargetKind::Gravimetric,
            grid: SearchGrid::Forest(ForestGrid::default()),
        },
    ]
}

impl ExperimentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_bins(mut self, max_bins: usize) -> Self {
        self.max_bins = max_bins;
        self
    }

    pub fn with_cv_folds(mut self, cv_folds: usize) -> Self {
        self.cv_folds = cv_folds;
        self
    }

    pub fn with_n_resamples(mut self, n_resamples: usize) -> Self {
        self.n_resamples = n_resamples;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_roster(mut self, roster: Vec<ModelSpec>) -> Self {
        self.roster = roster;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(invalid(
                "test_fraction",
                format!("{}", self.test_fraction),
                "must be in (0, 1)",
            ));
        }
        if self.max_bins < 2 {
            return Err(invalid(
                "max_bins",
                format!("{}", self.max_bins),
                "must be at least 2",
            ));
        }
        if self.cv_folds < 2 {
            return Err(invalid(
                "cv_folds",
                format!("{}", self.cv_folds),
                "must be at least 2",
            ));
        }
        if self.n_resamples == 0 {
            return Err(invalid(
                "n_resamples",
                format!("{}", self.n_resamples),
                "must be positive",
            ));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(invalid(
                "alpha",
                format!("{}", self.alpha),
                "must be in (0, 1)",
            ));
        }
        if self.roster.is_empty() {
            return Err(invalid("roster", "[]".to_string(), "must name a model"));
        }
        for spec in &self.roster {
            if spec.name.is_empty() {
                return Err(invalid("roster", "\"\"".to_string(), "model name is empty"));
            }
            if spec.grid.is_empty() {
                return Err(invalid(
                    "roster",
                    spec.name.clone(),
                    "grid contains no candidates",
                ));
            }
        }
        let mut names: Vec<&str> = self.roster.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != self.roster.len() {
            return Err(invalid(
                "roster",
                format!("{} entries", self.roster.len()),
                "model names must be unique",
            ));
        }
        Ok(())
    }
}

fn invalid(name: &str, value: String, reason: &str) -> MofcapError {
    MofcapError::InvalidParameter {
        name: name.to_string(),
        value,
        reason: reason.to_string(),
    }
}
