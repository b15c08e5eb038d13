//! Polynomial feature expansion

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{MofcapError, Result};

/// Expands a feature matrix with polynomial terms up to a given degree.
///
/// Output columns follow combinations-with-replacement order: the raw
/// features first, then all degree-2 products, and so on. With the bias
/// column disabled (the default), 5 input features at degree 2 expand
/// to 20 columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolynomialExpansion {
    degree: usize,
    include_bias: bool,
    n_features_in: Option<usize>,
    combinations: Option<Vec<Vec<usize>>>,
}

impl PolynomialExpansion {
    pub fn new(degree: usize) -> Self {
        Self {
            degree: degree.max(1),
            include_bias: false,
            n_features_in: None,
            combinations: None,
        }
    }

    pub fn with_bias(mut self, include_bias: bool) -> Self {
        self.include_bias = include_bias;
        self
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Number of output columns, `None` before fitting.
    pub fn n_output_features(&self) -> Option<usize> {
        self.combinations.as_ref().map(|c| c.len())
    }

    /// Record the input width and enumerate the term index combinations.
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        let n_features = x.ncols();
        if n_features == 0 {
            return Err(MofcapError::DataError(
                "cannot expand a matrix with zero feature columns".to_string(),
            ));
        }
        self.combinations = Some(self.generate_combinations(n_features));
        self.n_features_in = Some(n_features);
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (combinations, n_features_in) = match (&self.combinations, self.n_features_in) {
            (Some(c), Some(n)) => (c, n),
            _ => return Err(MofcapError::ModelNotFitted),
        };
        if x.ncols() != n_features_in {
            return Err(MofcapError::ShapeError {
                expected: format!("{} feature columns", n_features_in),
                actual: format!("{}", x.ncols()),
            });
        }

        let n_samples = x.nrows();
        let mut output = Array2::zeros((n_samples, combinations.len()));
        for (col, combination) in combinations.iter().enumerate() {
            for row in 0..n_samples {
                let mut value = 1.0;
                for &feature_idx in combination {
                    value *= x[[row, feature_idx]];
                }
                output[[row, col]] = value;
            }
        }
        Ok(output)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Human-readable term names, e.g. `"density"`, `"density^2"`, `"density * SSA"`.
    pub fn feature_names(&self, input_names: &[&str]) -> Result<Vec<String>> {
        let combinations = self
            .combinations
            .as_ref()
            .ok_or(MofcapError::ModelNotFitted)?;
        let n_features_in = self.n_features_in.unwrap_or(0);
        if input_names.len() != n_features_in {
            return Err(MofcapError::ShapeError {
                expected: format!("{} input names", n_features_in),
                actual: format!("{}", input_names.len()),
            });
        }
        Ok(combinations
            .iter()
            .map(|c| term_name(c, input_names))
            .collect())
    }

    fn generate_combinations(&self, n_features: usize) -> Vec<Vec<usize>> {
        let mut combinations = Vec::new();
        if self.include_bias {
            combinations.push(Vec::new());
        }
        for degree in 1..=self.degree {
            let mut current = Vec::with_capacity(degree);
            push_combinations(n_features, degree, 0, &mut current, &mut combinations);
        }
        combinations
    }
}

impl Default for PolynomialExpansion {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Index combinations with replacement, in lexicographic order.
fn push_combinations(
    n_features: usize,
    degree: usize,
    start: usize,
    current: &mut Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) {
    if current.len() == degree {
        out.push(current.clone());
        return;
    }
    for i in start..n_features {
        current.push(i);
        push_combinations(n_features, degree, i, current, out);
        current.pop();
    }
}

fn term_name(combination: &[usize], input_names: &[&str]) -> String {
    if combination.is_empty() {
        return "1".to_string();
    }
    let mut parts: Vec<String> = Vec::new();
    let mut i = 0;
    while i < combination.len() {
        let idx = combination[i];
        let mut power = 1;
        while i + power < combination.len() && combination[i + power] == idx {
            power += 1;
        }
        if power == 1 {
            parts.push(input_names[idx].to_string());
        } else {
            parts.push(format!("{}^{}", input_names[idx], power));
        }
        i += power;
    }
    parts.join(" * ")
}
