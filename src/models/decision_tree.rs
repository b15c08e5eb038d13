//! Regression tree with variance-reduction splits

use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{MofcapError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

/// CART-style regression tree.
///
/// Split thresholds are midpoints between adjacent distinct feature values;
/// split quality is the reduction of the mean squared error. Degenerate
/// inputs (too few rows, constant target) collapse to a single leaf rather
/// than erroring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    n_features: Option<usize>,
    feature_importances: Option<Array1<f64>>,
    is_fitted: bool,
}

impl RegressionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            n_features: None,
            feature_importances: None,
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

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Normalized importance per feature, `None` before fitting.
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
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

        let indices: Vec<usize> = (0..x.nrows()).collect();
        let mut importances = Array1::<f64>::zeros(x.ncols());
        let root = self.build(x, y, &indices, 0, &mut importances);

        let total = importances.sum();
        if total > 0.0 {
            importances.mapv_inplace(|v| v / total);
        }

        self.root = Some(root);
        self.n_features = Some(x.ncols());
        self.feature_importances = Some(importances);
        self.is_fitted = true;
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(MofcapError::ModelNotFitted)?;
        if let Some(n_features) = self.n_features {
            if x.ncols() != n_features {
                return Err(MofcapError::ShapeError {
                    expected: format!("{} columns", n_features),
                    actual: format!("{}", x.ncols()),
                });
            }
        }
        Ok((0..x.nrows())
            .map(|i| predict_row(root, x.row(i)))
            .collect())
    }

    /// Depth of the fitted tree; a lone leaf has depth 0.
    pub fn depth(&self) -> usize {
        self.root.as_ref().map_or(0, node_depth)
    }

    pub fn n_leaves(&self) -> usize {
        self.root.as_ref().map_or(0, count_leaves)
    }

    fn build(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        importances: &mut Array1<f64>,
    ) -> TreeNode {
        let n = indices.len();
        let value = indices.iter().map(|&i| y[i]).sum::<f64>() / n as f64;

        let depth_reached = self.max_depth.is_some_and(|d| depth >= d);
        if n < self.min_samples_split || n < 2 * self.min_samples_leaf || depth_reached {
            return TreeNode::Leaf { value };
        }

        let Some(split) = self.find_best_split(x, y, indices) else {
            return TreeNode::Leaf { value };
        };

        // weighted impurity decrease, normalized at the end of fit
        importances[split.feature] += n as f64 * split.gain;

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, split.feature]] <= split.threshold);

        TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.build(x, y, &left_indices, depth + 1, importances)),
            right: Box::new(self.build(x, y, &right_indices, depth + 1, importances)),
        }
    }

    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
    ) -> Option<SplitCandidate> {
        let parent_impurity = impurity(y, indices);
        if parent_impurity == 0.0 {
            return None;
        }

        let per_feature: Vec<Option<SplitCandidate>> = (0..x.ncols())
            .into_par_iter()
            .map(|feature| self.best_split_for_feature(x, y, indices, feature, parent_impurity))
            .collect();

        // in-order reduction keeps the result independent of thread scheduling
        let mut best: Option<SplitCandidate> = None;
        for candidate in per_feature.into_iter().flatten() {
            match &best {
                Some(current) if candidate.gain <= current.gain => {}
                _ => best = Some(candidate),
            }
        }
        best
    }

    fn best_split_for_feature(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        feature: usize,
        parent_impurity: f64,
    ) -> Option<SplitCandidate> {
        let mut values: Vec<f64> = indices.iter().map(|&i| x[[i, feature]]).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup();
        if values.len() < 2 {
            return None;
        }

        let n = indices.len() as f64;
        let mut best: Option<SplitCandidate> = None;

        for pair in values.windows(2) {
            let threshold = (pair[0] + pair[1]) / 2.0;

            let mut left_n = 0usize;
            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            let mut right_n = 0usize;
            let mut right_sum = 0.0;
            let mut right_sq = 0.0;
            for &i in indices {
                let target = y[i];
                if x[[i, feature]] <= threshold {
                    left_n += 1;
                    left_sum += target;
                    left_sq += target * target;
                } else {
                    right_n += 1;
                    right_sum += target;
                    right_sq += target * target;
                }
            }

            if left_n < self.min_samples_leaf || right_n < self.min_samples_leaf {
                continue;
            }

            let left_var = variance_from_sums(left_sum, left_sq, left_n);
            let right_var = variance_from_sums(right_sum, right_sq, right_n);
            let weighted = (left_n as f64 * left_var + right_n as f64 * right_var) / n;
            let gain = parent_impurity - weighted;

            if gain > 0.0 && best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    gain,
                });
            }
        }
        best
    }
}

impl Default for RegressionTree {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

fn predict_row(node: &TreeNode, row: ArrayView1<f64>) -> f64 {
    match node {
        TreeNode::Leaf { value } => *value,
        TreeNode::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if row[*feature] <= *threshold {
                predict_row(left, row)
            } else {
                predict_row(right, row)
            }
        }
    }
}

fn node_depth(node: &TreeNode) -> usize {
    match node {
        TreeNode::Leaf { .. } => 0,
        TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
    }
}

fn count_leaves(node: &TreeNode) -> usize {
    match node {
        TreeNode::Leaf { .. } => 1,
        TreeNode::Split { left, right, .. } => count_leaves(left) + count_leaves(right),
    }
}

fn impurity(y: &Array1<f64>, indices: &[usize]) -> f64 {
    let mut sum = 0.0;
    let mut sq = 0.0;
    for &i in indices {
        sum += y[i];
        sq += y[i] * y[i];
    }
    variance_from_sums(sum, sq, indices.len())
}

fn variance_from_sums(sum: f64, sq_sum: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    let mean = sum / n;
    (sq_sum / n - mean * mean).max(0.0)
}
