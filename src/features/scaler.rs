//! Column-wise min-max scaling

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{MofcapError, Result};

/// Rescales each column to `[0, 1]` using the range observed at fit time.
///
/// A constant column gets scale 1.0 so transform maps it to 0 instead of
/// dividing by zero. Data outside the fitted range maps outside `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinMaxScaler {
    mins: Option<Array1<f64>>,
    scales: Option<Array1<f64>>,
    is_fitted: bool,
}

impl MinMaxScaler {
    pub fn new() -> Self {
        Self {
            mins: None,
            scales: None,
            is_fitted: false,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(MofcapError::DataError(
                "cannot fit scaler on an empty matrix".to_string(),
            ));
        }

        let n_cols = x.ncols();
        let mut mins = Array1::zeros(n_cols);
        let mut scales = Array1::zeros(n_cols);
        for j in 0..n_cols {
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for &v in x.column(j) {
                lo = lo.min(v);
                hi = hi.max(v);
            }
            let range = hi - lo;
            mins[j] = lo;
            scales[j] = if range == 0.0 { 1.0 } else { range };
        }

        self.mins = Some(mins);
        self.scales = Some(scales);
        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (mins, scales) = match (&self.mins, &self.scales) {
            (Some(m), Some(s)) => (m, s),
            _ => return Err(MofcapError::ModelNotFitted),
        };
        if x.ncols() != mins.len() {
            return Err(MofcapError::ShapeError {
                expected: format!("{} columns", mins.len()),
                actual: format!("{}", x.ncols()),
            });
        }

        let mut output = x.to_owned();
        for j in 0..x.ncols() {
            let lo = mins[j];
            let scale = scales[j];
            for v in output.column_mut(j) {
                *v = (*v - lo) / scale;
            }
        }
        Ok(output)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

impl Default for MinMaxScaler {
    fn default() -> Self {
        Self::new()
    }
}
