//! Percentile bootstrap over held-out predictions
//!
//! The fitted pipeline predicts the evaluation set exactly once; each
//! replicate then resamples row indices with replacement and rescores the
//! gathered pairs. Replicate `i` seeds its own ChaCha8 stream with
//! `seed + i`, so the score table is reproducible and independent of how
//! replicates are scheduled across threads.

use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{MofcapError, Result};
use crate::metrics::{mean_absolute_error, quantile, r2_score};
use crate::pipeline::FittedPipeline;

/// Metric pair for one bootstrap replicate.
///
/// `r2` is `NaN` when the resampled target is degenerate: fewer than two
/// rows, or every drawn row sharing one target value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreSample {
    pub r2: f64,
    pub mae: f64,
}

/// Two-sided percentile interval
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

/// Interval summary of a bootstrap score table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapSummary {
    pub r2: ConfidenceInterval,
    pub mae: ConfidenceInterval,
    pub alpha: f64,
    pub n_resamples: usize,
    /// Replicates whose R² was undefined and excluded from the quantiles
    pub degenerate: usize,
}

/// Score `n_resamples` bootstrap replicates of the evaluation set.
pub fn bootstrap_scores(
    pipeline: &FittedPipeline,
    x_eval: &Array2<f64>,
    y_eval: &Array1<f64>,
    n_resamples: usize,
    seed: u64,
) -> Result<Vec<ScoreSample>> {
    if x_eval.nrows() != y_eval.len() {
        return Err(MofcapError::ShapeError {
            expected: format!("{} target values", x_eval.nrows()),
            actual: format!("{}", y_eval.len()),
        });
    }
    let n = y_eval.len();
    if n == 0 {
        // nothing to resample; every replicate is undefined
        return Ok(vec![
            ScoreSample {
                r2: f64::NAN,
                mae: f64::NAN,
            };
            n_resamples
        ]);
    }

    let predictions = pipeline.predict(x_eval)?;

    let samples: Vec<ScoreSample> = (0..n_resamples)
        .into_par_iter()
        .map(|i| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(i as u64));
            let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let y_sample: Array1<f64> = indices.iter().map(|&j| y_eval[j]).collect();
            let p_sample: Array1<f64> = indices.iter().map(|&j| predictions[j]).collect();
            ScoreSample {
                r2: r2_score(&y_sample, &p_sample),
                mae: mean_absolute_error(&y_sample, &p_sample),
            }
        })
        .collect();

    Ok(samples)
}

/// Percentile interval at `alpha/2` and `1 - alpha/2` for both metrics.
///
/// Undefined R² replicates are excluded from the quantiles and surfaced
/// through [`BootstrapSummary::degenerate`].
pub fn summarize(samples: &[ScoreSample], alpha: f64) -> Result<BootstrapSummary> {
    if !(0.0..1.0).contains(&alpha) || alpha == 0.0 {
        return Err(MofcapError::InvalidParameter {
            name: "alpha".to_string(),
            value: format!("{alpha}"),
            reason: "must be in (0, 1)".to_string(),
        });
    }

    let r2_values: Vec<f64> = samples.iter().map(|s| s.r2).filter(|v| !v.is_nan()).collect();
    let mae_values: Vec<f64> = samples
        .iter()
        .map(|s| s.mae)
        .filter(|v| !v.is_nan())
        .collect();
    let degenerate = samples.len() - r2_values.len();
    if degenerate > 0 {
        warn!(
            degenerate,
            total = samples.len(),
            "bootstrap replicates with undefined R² excluded from interval"
        );
    }

    Ok(BootstrapSummary {
        r2: percentile_interval(&r2_values, alpha),
        mae: percentile_interval(&mae_values, alpha),
        alpha,
        n_resamples: samples.len(),
        degenerate,
    })
}

fn percentile_interval(values: &[f64], alpha: f64) -> ConfidenceInterval {
    ConfidenceInterval {
        lower: quantile(values, alpha / 2.0),
        upper: quantile(values, 1.0 - alpha / 2.0),
    }
}
