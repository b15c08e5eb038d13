//! Random forest regressor

use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{MofcapError, Result};

use super::decision_tree::RegressionTree;

/// Bagged ensemble of regression trees.
///
/// Trees are trained in parallel; tree `i` draws its bootstrap sample from
/// a ChaCha8 stream seeded with `random_state + i`, so a fixed seed gives
/// a bit-identical ensemble regardless of thread count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    trees: Vec<RegressionTree>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub bootstrap: bool,
    pub random_state: Option<u64>,
    n_features: Option<usize>,
    is_fitted: bool,
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators: n_estimators.max(1),
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
            random_state: None,
            n_features: None,
            is_fitted: false,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split.max(2);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf.max(1);
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(MofcapError::DataError(
                "cannot fit on an empty matrix".to_string(),
            ));
        }
        if x.nrows() != y.len() {
            return Err(MofcapError::ShapeError {
                expected: format!("{} target values", x.nrows()),
                actual: format!("{}", y.len()),
            });
        }

        let n_samples = x.nrows();
        let base_seed = self.random_state.unwrap_or(42);

        let trees: Vec<RegressionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| -> Result<RegressionTree> {
                let mut tree = RegressionTree::new()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf);
                if let Some(depth) = self.max_depth {
                    tree = tree.with_max_depth(depth);
                }

                if self.bootstrap {
                    let mut rng =
                        ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));
                    let indices: Vec<usize> =
                        (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
                    let x_sample = x.select(Axis(0), &indices);
                    let y_sample = y.select(Axis(0), &indices);
                    tree.fit(&x_sample, &y_sample)?;
                } else {
                    tree.fit(x, y)?;
                }
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.n_features = Some(x.ncols());
        self.is_fitted = true;
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted || self.trees.is_empty() {
            return Err(MofcapError::ModelNotFitted);
        }
        if let Some(n_features) = self.n_features {
            if x.ncols() != n_features {
                return Err(MofcapError::ShapeError {
                    expected: format!("{} columns", n_features),
                    actual: format!("{}", x.ncols()),
                });
            }
        }

        let per_tree: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let mut mean = Array1::<f64>::zeros(x.nrows());
        for preds in &per_tree {
            mean = mean + preds;
        }
        Ok(mean / self.trees.len() as f64)
    }

    /// Importances averaged over trees and renormalized, `None` before fitting.
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        let n_features = self.n_features?;
        if self.trees.is_empty() {
            return None;
        }

        let mut total = Array1::<f64>::zeros(n_features);
        for tree in &self.trees {
            if let Some(importances) = tree.feature_importances() {
                total = total + importances;
            }
        }
        let sum = total.sum();
        if sum > 0.0 {
            total.mapv_inplace(|v| v / sum);
        }
        Some(total)
    }
}
