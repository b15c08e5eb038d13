//! Fitted transform + estimator bundle

use std::path::Path;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::features::FeatureTransform;
use crate::models::{Estimator, HyperParams, ModelFamily};

/// A feature transform and estimator fitted together on the same rows.
///
/// Raw descriptor matrices go in; the pipeline expands, scales and
/// predicts with the statistics captured at fit time. Serializes to JSON
/// for reuse outside the run that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedPipeline {
    pub transform: FeatureTransform,
    pub estimator: Estimator,
    pub params: HyperParams,
}

impl FittedPipeline {
    pub fn new(transform: FeatureTransform, estimator: Estimator, params: HyperParams) -> Self {
        Self {
            transform,
            estimator,
            params,
        }
    }

    pub fn family(&self) -> ModelFamily {
        self.estimator.family()
    }

    /// Predict from raw descriptor rows.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let transformed = self.transform.transform(x)?;
        self.estimator.predict(&transformed)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<FittedPipeline> {
        let json = std::fs::read_to_string(path)?;
        let pipeline = serde_json::from_str(&json)?;
        Ok(pipeline)
    }
}
