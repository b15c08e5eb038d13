//! Estimator families and hyperparameter grids

pub mod decision_tree;
pub mod linear;
pub mod random_forest;

pub use decision_tree::RegressionTree;
pub use linear::{LassoRegression, RidgeRegression};
pub use random_forest::RandomForestRegressor;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Estimator family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelFamily {
    Ridge,
    Lasso,
    RandomForest,
}

impl ModelFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::Ridge => "ridge",
            ModelFamily::Lasso => "lasso",
            ModelFamily::RandomForest => "random_forest",
        }
    }
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One hyperparameter configuration drawn from a grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HyperParams {
    Ridge {
        alpha: f64,
    },
    Lasso {
        alpha: f64,
        max_iter: usize,
    },
    Forest {
        n_estimators: usize,
        max_depth: Option<usize>,
        min_samples_leaf: usize,
    },
}

impl HyperParams {
    pub fn family(&self) -> ModelFamily {
        match self {
            HyperParams::Ridge { .. } => ModelFamily::Ridge,
            HyperParams::Lasso { .. } => ModelFamily::Lasso,
            HyperParams::Forest { .. } => ModelFamily::RandomForest,
        }
    }

    /// Compact `key=value` rendering for logs
    pub fn describe(&self) -> String {
        match self {
            HyperParams::Ridge { alpha } => format!("alpha={}", alpha),
            HyperParams::Lasso { alpha, max_iter } => {
                format!("alpha={}, max_iter={}", alpha, max_iter)
            }
            HyperParams::Forest {
                n_estimators,
                max_depth,
                min_samples_leaf,
            } => {
                let depth = match max_depth {
                    Some(d) => d.to_string(),
                    None => "none".to_string(),
                };
                format!(
                    "n_estimators={}, max_depth={}, min_samples_leaf={}",
                    n_estimators, depth, min_samples_leaf
                )
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeGrid {
    pub alphas: Vec<f64>,
}

impl Default for RidgeGrid {
    fn default() -> Self {
        Self {
            alphas: vec![0.01, 0.1, 1.0, 10.0],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LassoGrid {
    pub alphas: Vec<f64>,
    pub max_iters: Vec<usize>,
}

impl Default for LassoGrid {
    fn default() -> Self {
        Self {
            alphas: vec![0.0001, 0.001, 0.01, 0.1],
            max_iters: vec![5000],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestGrid {
    pub n_estimators: Vec<usize>,
    pub max_depths: Vec<Option<usize>>,
    pub min_samples_leaf: Vec<usize>,
}

impl Default for ForestGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![300],
            max_depths: vec![None, Some(8), Some(12)],
            min_samples_leaf: vec![1, 3],
        }
    }
}

/// Grid of candidate configurations for one estimator family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SearchGrid {
    Ridge(RidgeGrid),
    Lasso(LassoGrid),
    Forest(ForestGrid),
}

impl SearchGrid {
    pub fn family(&self) -> ModelFamily {
        match self {
            SearchGrid::Ridge(_) => ModelFamily::Ridge,
            SearchGrid::Lasso(_) => ModelFamily::Lasso,
            SearchGrid::Forest(_) => ModelFamily::RandomForest,
        }
    }

    /// Candidates in declared parameter order.
    ///
    /// The enumeration order is load-bearing: the search breaks score ties
    /// in favor of the earliest candidate.
    pub fn candidates(&self) -> Vec<HyperParams> {
        match self {
            SearchGrid::Ridge(grid) => grid
                .alphas
                .iter()
                .map(|&alpha| HyperParams::Ridge { alpha })
                .collect(),
            SearchGrid::Lasso(grid) => {
                let mut out = Vec::with_capacity(grid.alphas.len() * grid.max_iters.len());
                for &alpha in &grid.alphas {
                    for &max_iter in &grid.max_iters {
                        out.push(HyperParams::Lasso { alpha, max_iter });
                    }
                }
                out
            }
            SearchGrid::Forest(grid) => {
                let mut out = Vec::new();
                for &n_estimators in &grid.n_estimators {
                    for &max_depth in &grid.max_depths {
                        for &min_samples_leaf in &grid.min_samples_leaf {
                            out.push(HyperParams::Forest {
                                n_estimators,
                                max_depth,
                                min_samples_leaf,
                            });
                        }
                    }
                }
                out
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            SearchGrid::Ridge(grid) => grid.alphas.is_empty(),
            SearchGrid::Lasso(grid) => grid.alphas.is_empty() || grid.max_iters.is_empty(),
            SearchGrid::Forest(grid) => {
                grid.n_estimators.is_empty()
                    || grid.max_depths.is_empty()
                    || grid.min_samples_leaf.is_empty()
            }
        }
    }
}

/// A fitted estimator of any family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Estimator {
    Ridge(RidgeRegression),
    Lasso(LassoRegression),
    Forest(RandomForestRegressor),
}

impl Estimator {
    /// Fit a fresh estimator for the given configuration.
    ///
    /// `seed` feeds the forest's bootstrap sampling; linear fits are
    /// deterministic and ignore it.
    pub fn fit(
        params: &HyperParams,
        x: &Array2<f64>,
        y: &Array1<f64>,
        seed: u64,
    ) -> Result<Estimator> {
        match params {
            HyperParams::Ridge { alpha } => {
                let mut model = RidgeRegression::new(*alpha);
                model.fit(x, y)?;
                Ok(Estimator::Ridge(model))
            }
            HyperParams::Lasso { alpha, max_iter } => {
                let mut model = LassoRegression::new(*alpha).with_max_iter(*max_iter);
                model.fit(x, y)?;
                Ok(Estimator::Lasso(model))
            }
            HyperParams::Forest {
                n_estimators,
                max_depth,
                min_samples_leaf,
            } => {
                let mut model = RandomForestRegressor::new(*n_estimators)
                    .with_min_samples_leaf(*min_samples_leaf)
                    .with_random_state(seed);
                if let Some(depth) = max_depth {
                    model = model.with_max_depth(*depth);
                }
                model.fit(x, y)?;
                Ok(Estimator::Forest(model))
            }
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Estimator::Ridge(model) => model.predict(x),
            Estimator::Lasso(model) => model.predict(x),
            Estimator::Forest(model) => model.predict(x),
        }
    }

    pub fn family(&self) -> ModelFamily {
        match self {
            Estimator::Ridge(_) => ModelFamily::Ridge,
            Estimator::Lasso(_) => ModelFamily::Lasso,
            Estimator::Forest(_) => ModelFamily::RandomForest,
        }
    }

    /// Linear coefficients, `None` for tree ensembles.
    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        match self {
            Estimator::Ridge(model) => model.coefficients.as_ref(),
            Estimator::Lasso(model) => model.coefficients.as_ref(),
            Estimator::Forest(_) => None,
        }
    }

    /// Impurity-based importances, `None` for linear models.
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        match self {
            Estimator::Forest(model) => model.feature_importances(),
            _ => None,
        }
    }
}
