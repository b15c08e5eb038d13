//! Regression metrics and empirical quantiles

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Coefficient of determination.
///
/// Returns `NaN` when the score is undefined: fewer than 2 observations,
/// or a target with zero variance. Callers that rank scores must treat a
/// non-finite value as "no score", never as a valid one.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len();
    if n < 2 || y_pred.len() != n {
        return f64::NAN;
    }

    let mean = y_true.sum() / n as f64;
    let ss_tot: f64 = y_true.iter().map(|&v| (v - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return f64::NAN;
    }

    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&t, &p)| (t - p).powi(2))
        .sum();

    1.0 - ss_res / ss_tot
}

/// Mean absolute error. `NaN` for empty inputs.
pub fn mean_absolute_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len();
    if n == 0 || y_pred.len() != n {
        return f64::NAN;
    }
    y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&t, &p)| (t - p).abs())
        .sum::<f64>()
        / n as f64
}

/// Root mean squared error. `NaN` for empty inputs.
pub fn root_mean_squared_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len();
    if n == 0 || y_pred.len() != n {
        return f64::NAN;
    }
    let mse: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&t, &p)| (t - p).powi(2))
        .sum::<f64>()
        / n as f64;
    mse.sqrt()
}

/// Held-out evaluation summary for a fitted model
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub r2: f64,
    pub mae: f64,
    pub rmse: f64,
    pub n_samples: usize,
}

impl RegressionMetrics {
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        Self {
            r2: r2_score(y_true, y_pred),
            mae: mean_absolute_error(y_true, y_pred),
            rmse: root_mean_squared_error(y_true, y_pred),
            n_samples: y_true.len(),
        }
    }
}

/// Empirical quantile with linear interpolation between order statistics.
///
/// `q` is clamped to `[0, 1]`. Values must be finite; filter sentinels
/// before calling. Returns `NaN` for an empty slice.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = pos - lo as f64;
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
}
