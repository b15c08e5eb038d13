//! Penalized linear regression
//!
//! Ridge solves the normal equations through a Cholesky factorization with
//! a Gauss-Jordan fallback for near-singular systems. Lasso runs cyclic
//! coordinate descent with soft thresholding.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{MofcapError, Result};

/// L2-regularized linear regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: Option<f64>,
    pub alpha: f64,
    pub fit_intercept: bool,
    is_fitted: bool,
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            coefficients: None,
            intercept: None,
            alpha,
            fit_intercept: true,
            is_fitted: false,
        }
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        validate_xy(x, y)?;
        if self.alpha < 0.0 {
            return Err(MofcapError::InvalidParameter {
                name: "alpha".to_string(),
                value: format!("{}", self.alpha),
                reason: "must be non-negative".to_string(),
            });
        }

        let (x_centered, y_centered, x_mean, y_mean) = center(x, y, self.fit_intercept)?;

        let n_features = x.ncols();
        let mut xtx = x_centered.t().dot(&x_centered);
        for i in 0..n_features {
            xtx[[i, i]] += self.alpha;
        }
        let xty = x_centered.t().dot(&y_centered);

        let coefficients = solve_spd(&xtx, &xty).ok_or_else(|| {
            MofcapError::ComputationError("singular normal equations in ridge solve".to_string())
        })?;

        self.intercept = Some(y_mean - x_mean.dot(&coefficients));
        self.coefficients = Some(coefficients);
        self.is_fitted = true;
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or(MofcapError::ModelNotFitted)?;
        if x.ncols() != coefficients.len() {
            return Err(MofcapError::ShapeError {
                expected: format!("{} columns", coefficients.len()),
                actual: format!("{}", x.ncols()),
            });
        }
        Ok(x.dot(coefficients) + self.intercept.unwrap_or(0.0))
    }
}

/// L1-regularized linear regression via cyclic coordinate descent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LassoRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: Option<f64>,
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub fit_intercept: bool,
    is_fitted: bool,
}

impl LassoRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            coefficients: None,
            intercept: None,
            alpha,
            max_iter: 1000,
            tol: 1e-4,
            fit_intercept: true,
            is_fitted: false,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        validate_xy(x, y)?;
        if self.alpha < 0.0 {
            return Err(MofcapError::InvalidParameter {
                name: "alpha".to_string(),
                value: format!("{}", self.alpha),
                reason: "must be non-negative".to_string(),
            });
        }

        let (x_centered, y_centered, x_mean, y_mean) = center(x, y, self.fit_intercept)?;

        let n_samples = x.nrows();
        let n_features = x.ncols();
        // objective 1/(2n) ||y - Xw||^2 + alpha ||w||_1, in unnormalized form
        let lambda = self.alpha * n_samples as f64;

        let col_sq_norms: Vec<f64> = (0..n_features)
            .map(|j| x_centered.column(j).dot(&x_centered.column(j)))
            .collect();

        let mut w = Array1::<f64>::zeros(n_features);
        let mut residual = y_centered.clone();

        for _ in 0..self.max_iter {
            let mut max_delta = 0.0f64;
            for j in 0..n_features {
                if col_sq_norms[j] == 0.0 {
                    continue;
                }
                let old_wj = w[j];
                let rho = x_centered.column(j).dot(&residual) + old_wj * col_sq_norms[j];
                let new_wj = soft_threshold(rho, lambda) / col_sq_norms[j];
                if new_wj != old_wj {
                    residual = &residual + &(&x_centered.column(j) * (old_wj - new_wj));
                    w[j] = new_wj;
                    max_delta = max_delta.max((new_wj - old_wj).abs());
                }
            }
            if max_delta < self.tol {
                break;
            }
        }

        self.intercept = Some(y_mean - x_mean.dot(&w));
        self.coefficients = Some(w);
        self.is_fitted = true;
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or(MofcapError::ModelNotFitted)?;
        if x.ncols() != coefficients.len() {
            return Err(MofcapError::ShapeError {
                expected: format!("{} columns", coefficients.len()),
                actual: format!("{}", x.ncols()),
            });
        }
        Ok(x.dot(coefficients) + self.intercept.unwrap_or(0.0))
    }
}

fn soft_threshold(z: f64, gamma: f64) -> f64 {
    if z > gamma {
        z - gamma
    } else if z < -gamma {
        z + gamma
    } else {
        0.0
    }
}

fn validate_xy(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
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
    Ok(())
}

/// Center features and target when fitting an intercept.
///
/// Returns `(x_centered, y_centered, x_mean, y_mean)`; means are zero when
/// the intercept is disabled.
fn center(
    x: &Array2<f64>,
    y: &Array1<f64>,
    fit_intercept: bool,
) -> Result<(Array2<f64>, Array1<f64>, Array1<f64>, f64)> {
    if !fit_intercept {
        return Ok((x.to_owned(), y.to_owned(), Array1::zeros(x.ncols()), 0.0));
    }
    let x_mean = x
        .mean_axis(Axis(0))
        .ok_or_else(|| MofcapError::DataError("cannot center an empty matrix".to_string()))?;
    let y_mean = y.mean().unwrap_or(0.0);
    let x_centered = x - &x_mean.clone().insert_axis(Axis(0));
    let y_centered = y - y_mean;
    Ok((x_centered, y_centered, x_mean, y_mean))
}

/// Solve `A w = b` for symmetric positive definite `A`.
///
/// Tries a plain Cholesky factorization, then one retry with a small
/// diagonal jitter, then a Gauss-Jordan inverse. Returns `None` when the
/// system is singular beyond repair.
fn solve_spd(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    if let Some(l) = cholesky_factor(a) {
        return Some(cholesky_back_substitute(&l, b));
    }

    let n = a.nrows();
    let trace: f64 = (0..n).map(|i| a[[i, i]]).sum();
    let eps = 1e-10 * (trace.abs() / n as f64).max(1.0);
    let mut jittered = a.clone();
    for i in 0..n {
        jittered[[i, i]] += eps;
    }
    if let Some(l) = cholesky_factor(&jittered) {
        return Some(cholesky_back_substitute(&l, b));
    }

    gauss_jordan_inverse(a).map(|inv| inv.dot(b))
}

fn cholesky_factor(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if sum <= 0.0 {
                    return None;
                }
                l[[i, j]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }
    Some(l)
}

/// Solve `L L^T w = b` given the lower-triangular factor.
fn cholesky_back_substitute(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();

    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * z[k];
        }
        z[i] = sum / l[[i, i]];
    }

    let mut w = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * w[k];
        }
        w[i] = sum / l[[i, i]];
    }
    w
}

fn gauss_jordan_inverse(m: &Array2<f64>) -> Option<Array2<f64>> {
    let n = m.nrows();
    let mut aug = Array2::<f64>::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = m[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    for col in 0..n {
        let mut pivot_row = col;
        let mut pivot_val = aug[[col, col]].abs();
        for row in (col + 1)..n {
            let candidate = aug[[row, col]].abs();
            if candidate > pivot_val {
                pivot_val = candidate;
                pivot_row = row;
            }
        }
        if pivot_val < 1e-12 {
            return None;
        }
        if pivot_row != col {
            for j in 0..2 * n {
                let tmp = aug[[col, j]];
                aug[[col, j]] = aug[[pivot_row, j]];
                aug[[pivot_row, j]] = tmp;
            }
        }

        let pivot = aug[[col, col]];
        for j in 0..2 * n {
            aug[[col, j]] /= pivot;
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = aug[[row, col]];
            if factor != 0.0 {
                for j in 0..2 * n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    let mut inv = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            inv[[i, j]] = aug[[i, n + j]];
        }
    }
    Some(inv)
}
