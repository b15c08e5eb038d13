//! Leakage-free feature transform
//!
//! Polynomial expansion followed by min-max scaling. Fit statistics come
//! exclusively from the data passed to [`FeatureTransform::fit`]; held-out
//! rows only ever go through [`FeatureTransform::transform`].

pub mod polynomial;
pub mod scaler;

pub use polynomial::PolynomialExpansion;
pub use scaler::MinMaxScaler;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{MofcapError, Result};

/// Degree-2 polynomial expansion (no bias column) followed by min-max scaling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureTransform {
    expansion: PolynomialExpansion,
    scaler: MinMaxScaler,
    is_fitted: bool,
}

impl FeatureTransform {
    pub fn new() -> Self {
        Self {
            expansion: PolynomialExpansion::new(2).with_bias(false),
            scaler: MinMaxScaler::new(),
            is_fitted: false,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Number of expanded columns, `None` before fitting.
    pub fn n_output_features(&self) -> Option<usize> {
        self.expansion.n_output_features()
    }

    /// Expanded term names against the given raw feature names.
    pub fn feature_names(&self, input_names: &[&str]) -> Result<Vec<String>> {
        self.expansion.feature_names(input_names)
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        let expanded = self.expansion.fit_transform(x)?;
        self.scaler.fit(&expanded)?;
        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(MofcapError::ModelNotFitted);
        }
        let expanded = self.expansion.transform(x)?;
        self.scaler.transform(&expanded)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

impl Default for FeatureTransform {
    fn default() -> Self {
        Self::new()
    }
}
