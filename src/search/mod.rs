//! Cross-validated hyperparameter search
//!
//! Every candidate configuration is scored by k-fold R² with the feature
//! transform refit inside each fold, so no fold ever sees statistics from
//! its own validation rows. Candidates are scored in parallel; the winner
//! is picked by an in-order reduction, so ties go to the earliest
//! candidate in grid order.

use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{MofcapError, Result};
use crate::features::FeatureTransform;
use crate::metrics::r2_score;
use crate::models::{Estimator, HyperParams, SearchGrid};
use crate::pipeline::FittedPipeline;

/// Score recorded for a candidate whose fit failed on some fold
pub const FAILED_SCORE: f64 = f64::NEG_INFINITY;

/// Validation/training index pair for one fold
#[derive(Debug, Clone)]
pub struct FoldIndices {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// Contiguous, unshuffled k-fold indices.
///
/// The first `n % k` folds take one extra row, so fold sizes differ by at
/// most one and every row validates exactly once.
pub fn k_fold_indices(n_samples: usize, n_splits: usize) -> Result<Vec<FoldIndices>> {
    if n_splits < 2 {
        return Err(MofcapError::InvalidParameter {
            name: "n_splits".to_string(),
            value: format!("{n_splits}"),
            reason: "must be at least 2".to_string(),
        });
    }
    if n_samples < n_splits {
        return Err(MofcapError::InvalidParameter {
            name: "n_splits".to_string(),
            value: format!("{n_splits}"),
            reason: format!("cannot exceed the {n_samples} available samples"),
        });
    }

    let base = n_samples / n_splits;
    let remainder = n_samples % n_splits;
    let mut folds = Vec::with_capacity(n_splits);
    let mut start = 0;
    for i in 0..n_splits {
        let size = if i < remainder { base + 1 } else { base };
        let validation: Vec<usize> = (start..start + size).collect();
        let train: Vec<usize> = (0..n_samples)
            .filter(|&j| j < start || j >= start + size)
            .collect();
        folds.push(FoldIndices { train, validation });
        start += size;
    }
    Ok(folds)
}

/// Cross-validation record for one candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateScore {
    pub params: HyperParams,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
    pub failed: bool,
}

/// Search result: the refit winner plus the full per-candidate table
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub pipeline: FittedPipeline,
    pub best_params: HyperParams,
    pub best_score: f64,
    pub candidates: Vec<CandidateScore>,
}

/// Exhaustive grid search over one estimator family
#[derive(Debug, Clone)]
pub struct GridSearch {
    grid: SearchGrid,
    cv_folds: usize,
    seed: u64,
}

impl GridSearch {
    pub fn new(grid: SearchGrid) -> Self {
        Self {
            grid,
            cv_folds: 5,
            seed: 42,
        }
    }

    pub fn with_cv_folds(mut self, cv_folds: usize) -> Self {
        self.cv_folds = cv_folds;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn run(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<SearchOutcome> {
        let candidates = self.grid.candidates();
        if candidates.is_empty() {
            return Err(MofcapError::InvalidParameter {
                name: "grid".to_string(),
                value: format!("{:?}", self.grid.family()),
                reason: "contains no candidate configurations".to_string(),
            });
        }
        let folds = k_fold_indices(x.nrows(), self.cv_folds)?;

        let scored: Vec<CandidateScore> = candidates
            .par_iter()
            .map(|params| self.score_candidate(params, x, y, &folds))
            .collect();

        for candidate in &scored {
            debug!(
                params = %candidate.params.describe(),
                mean_score = candidate.mean_score,
                failed = candidate.failed,
                "candidate scored"
            );
        }

        // strictly-greater in-order reduction; non-finite scores never win
        let mut best: Option<(usize, f64)> = None;
        for (i, candidate) in scored.iter().enumerate() {
            if !candidate.mean_score.is_finite() {
                continue;
            }
            match best {
                Some((_, score)) if candidate.mean_score <= score => {}
                _ => best = Some((i, candidate.mean_score)),
            }
        }
        let (best_idx, best_score) = best.ok_or_else(|| {
            MofcapError::SearchError(format!(
                "every {} candidate failed cross-validation",
                self.grid.family()
            ))
        })?;
        let best_params = scored[best_idx].params.clone();
        info!(
            family = %self.grid.family(),
            params = %best_params.describe(),
            score = best_score,
            "search winner refit on full training set"
        );

        let mut transform = FeatureTransform::new();
        let x_transformed = transform.fit_transform(x)?;
        let estimator = Estimator::fit(&best_params, &x_transformed, y, self.seed)?;

        Ok(SearchOutcome {
            pipeline: FittedPipeline::new(transform, estimator, best_params.clone()),
            best_params,
            best_score,
            candidates: scored,
        })
    }

    fn score_candidate(
        &self,
        params: &HyperParams,
        x: &Array2<f64>,
        y: &Array1<f64>,
        folds: &[FoldIndices],
    ) -> CandidateScore {
        let mut fold_scores = Vec::with_capacity(folds.len());
        for fold in folds {
            match self.fold_score(params, x, y, fold) {
                Ok(score) => fold_scores.push(score),
                Err(err) => {
                    debug!(params = %params.describe(), error = %err, "candidate fold failed");
                    return CandidateScore {
                        params: params.clone(),
                        fold_scores,
                        mean_score: FAILED_SCORE,
                        std_score: 0.0,
                        failed: true,
                    };
                }
            }
        }
        let (mean_score, std_score) = mean_std(&fold_scores);
        CandidateScore {
            params: params.clone(),
            fold_scores,
            mean_score,
            std_score,
            failed: false,
        }
    }

    fn fold_score(
        &self,
        params: &HyperParams,
        x: &Array2<f64>,
        y: &Array1<f64>,
        fold: &FoldIndices,
    ) -> Result<f64> {
        let x_train = x.select(Axis(0), &fold.train);
        let y_train = y.select(Axis(0), &fold.train);
        let x_val = x.select(Axis(0), &fold.validation);
        let y_val = y.select(Axis(0), &fold.validation);

        let mut transform = FeatureTransform::new();
        let xt_train = transform.fit_transform(&x_train)?;
        let xt_val = transform.transform(&x_val)?;

        let estimator = Estimator::fit(params, &xt_train, &y_train, self.seed)?;
        let predictions = estimator.predict(&xt_val)?;
        Ok(r2_score(&y_val, &predictions))
    }
}

fn mean_std(scores: &[f64]) -> (f64, f64) {
    if scores.is_empty() {
        return (f64::NAN, 0.0);
    }
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ForestGrid, RidgeGrid};
    use ndarray::Array2;

    fn linear_data(n: usize) -> (Array2<f64>, Array1<f64>) {
        // two descriptors with a clean linear response plus mild curvature
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            if j == 0 {
                i as f64 / n as f64
            } else {
                ((i * 7) % n) as f64 / n as f64
            }
        });
        let y = Array1::from_shape_fn(n, |i| {
            let a = x[[i, 0]];
            let b = x[[i, 1]];
            3.0 + 2.0 * a - 1.5 * b + 0.5 * a * a
        });
        (x, y)
    }

    #[test]
    fn test_k_fold_sizes_and_coverage() {
        let folds = k_fold_indices(50, 5).unwrap();
        assert_eq!(folds.len(), 5);
        for fold in &folds {
            assert_eq!(fold.validation.len(), 10);
            assert_eq!(fold.train.len(), 40);
        }
        let mut all: Vec<usize> = folds.iter().flat_map(|f| f.validation.clone()).collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_k_fold_uneven_sizes() {
        let folds = k_fold_indices(23, 5).unwrap();
        let sizes: Vec<usize> = folds.iter().map(|f| f.validation.len()).collect();
        assert_eq!(sizes, vec![5, 5, 5, 4, 4]);
    }

    #[test]
    fn test_k_fold_contiguous_blocks() {
        let folds = k_fold_indices(10, 2).unwrap();
        assert_eq!(folds[0].validation, (0..5).collect::<Vec<_>>());
        assert_eq!(folds[1].validation, (5..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_k_fold_too_few_samples_fails() {
        assert!(matches!(
            k_fold_indices(3, 5),
            Err(MofcapError::InvalidParameter { .. })
        ));
        assert!(matches!(
            k_fold_indices(10, 1),
            Err(MofcapError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_search_picks_low_alpha_on_clean_data() {
        let (x, y) = linear_data(40);
        let search = GridSearch::new(SearchGrid::Ridge(RidgeGrid::default())).with_cv_folds(5);
        let outcome = search.run(&x, &y).unwrap();
        assert_eq!(outcome.candidates.len(), 4);
        assert!(outcome.best_score > 0.9, "best R² = {}", outcome.best_score);
        // clean noiseless data favors the weakest penalty
        assert_eq!(outcome.best_params, HyperParams::Ridge { alpha: 0.01 });
    }

    #[test]
    fn test_tie_break_prefers_first_candidate() {
        // duplicate alphas produce identical scores; the first must win
        let (x, y) = linear_data(30);
        let grid = SearchGrid::Ridge(RidgeGrid {
            alphas: vec![1.0, 1.0, 1.0],
        });
        let outcome = GridSearch::new(grid).run(&x, &y).unwrap();
        let scores: Vec<f64> = outcome.candidates.iter().map(|c| c.mean_score).collect();
        assert!((scores[0] - scores[1]).abs() < 1e-15);
        assert!((scores[1] - scores[2]).abs() < 1e-15);
        assert!((outcome.best_score - scores[0]).abs() < 1e-15);
    }

    #[test]
    fn test_single_candidate_grid_selects_it() {
        let (x, y) = linear_data(25);
        let grid = SearchGrid::Ridge(RidgeGrid { alphas: vec![0.5] });
        let outcome = GridSearch::new(grid).run(&x, &y).unwrap();
        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.best_params, HyperParams::Ridge { alpha: 0.5 });
        assert!(!outcome.candidates[0].failed);
    }

    #[test]
    fn test_search_is_deterministic() {
        let (x, y) = linear_data(35);
        let grid = SearchGrid::Forest(ForestGrid {
            n_estimators: vec![10],
            max_depths: vec![None, Some(3)],
            min_samples_leaf: vec![1],
        });
        let a = GridSearch::new(grid.clone()).with_seed(42).run(&x, &y).unwrap();
        let b = GridSearch::new(grid).with_seed(42).run(&x, &y).unwrap();
        assert_eq!(a.best_params, b.best_params);
        for (ca, cb) in a.candidates.iter().zip(b.candidates.iter()) {
            assert_eq!(ca.fold_scores, cb.fold_scores);
        }
    }

    #[test]
    fn test_empty_grid_fails() {
        let (x, y) = linear_data(20);
        let grid = SearchGrid::Ridge(RidgeGrid { alphas: vec![] });
        assert!(matches!(
            GridSearch::new(grid).run(&x, &y),
            Err(MofcapError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_failed_candidate_gets_sentinel_but_search_survives() {
        let (x, y) = linear_data(30);
        // negative alpha fails validation inside the fold fit
        let grid = SearchGrid::Ridge(RidgeGrid {
            alphas: vec![-1.0, 0.1],
        });
        let outcome = GridSearch::new(grid).run(&x, &y).unwrap();
        assert!(outcome.candidates[0].failed);
        assert_eq!(outcome.candidates[0].mean_score, FAILED_SCORE);
        assert!(!outcome.candidates[1].failed);
        assert_eq!(outcome.best_params, HyperParams::Ridge { alpha: 0.1 });
    }

    #[test]
    fn test_all_candidates_failing_is_an_error() {
        let (x, y) = linear_data(20);
        let grid = SearchGrid::Ridge(RidgeGrid {
            alphas: vec![-1.0, -2.0],
        });
        assert!(matches!(
            GridSearch::new(grid).run(&x, &y),
            Err(MofcapError::SearchError(_))
        ));
    }
}
