//! Lasso solver (L1-penalized least squares) by coordinate descent.

use crate::core::RegressionOptions;
use crate::solvers::traits::RegressionError;
use crate::utils::{center_columns, center_vector, scale_columns};
use faer::{Col, Mat};

/// Coefficients below this magnitude count as exactly zero.
pub(crate) const ZERO_TOLERANCE: f64 = 1e-10;

/// Lasso path solver using coordinate descent.
///
/// Minimizes, with the glmnet scaling of the penalty,
///
/// (1/2n)||y - β₀ - Xβ||² + λ||β||₁
///
/// Covariates are standardized internally when `standardize` is set and the
/// coefficients are reported on the original scale. The intercept is never
/// penalized.
///
/// ```rust,ignore
/// use fission_rs::core::RegressionOptions;
/// use fission_rs::solvers::{lambda_grid, LassoRegressor};
///
/// let lasso = LassoRegressor::new(RegressionOptions::default());
/// let lambda_max = lasso.lambda_max(&x, &y)?;
/// let path = lasso.fit_path(&x, &y, &lambda_grid(lambda_max, 100, 1e-4))?;
/// let last = path.coefficients.ncols() - 1;
/// let yhat = path.predict(last, &x_test);
/// ```
#[derive(Debug, Clone)]
pub struct LassoRegressor {
    options: RegressionOptions,
}

/// Centered (and optionally scaled) copy of a design, with the data needed to
/// map coefficients back to the original scale.
#[derive(Debug, Clone)]
struct Standardized {
    x: Mat<f64>,
    y: Col<f64>,
    x_means: Col<f64>,
    x_scales: Col<f64>,
    y_mean: f64,
    col_sq: Vec<f64>,
}

/// Coefficients along a decreasing grid of penalties.
#[derive(Debug, Clone)]
pub struct LassoPath {
    /// Penalties, largest first.
    pub lambdas: Vec<f64>,
    /// Coefficients on the original scale, `p × n_lambda`.
    pub coefficients: Mat<f64>,
    /// Intercepts, one per penalty.
    pub intercepts: Vec<f64>,
}

impl LassoPath {
    /// Predictions of the `k`-th model on new rows.
    pub fn predict(&self, k: usize, x: &Mat<f64>) -> Col<f64> {
        let p = self.coefficients.nrows();
        Col::from_fn(x.nrows(), |i| {
            let mut pred = self.intercepts[k];
            for j in 0..p {
                pred += x[(i, j)] * self.coefficients[(j, k)];
            }
            pred
        })
    }
}

impl LassoRegressor {
    /// Create a new lasso regressor with the given options.
    pub fn new(options: RegressionOptions) -> Self {
        Self { options }
    }

    /// Soft thresholding operator: S(z, γ) = sign(z) * max(|z| - γ, 0)
    fn soft_threshold(z: f64, gamma: f64) -> f64 {
        if z > gamma {
            z - gamma
        } else if z < -gamma {
            z + gamma
        } else {
            0.0
        }
    }

    fn validate_input(x: &Mat<f64>, y: &Col<f64>) -> Result<(), RegressionError> {
        if x.nrows() != y.nrows() {
            return Err(RegressionError::DimensionMismatch {
                x_rows: x.nrows(),
                y_len: y.nrows(),
            });
        }
        if x.nrows() < 2 {
            return Err(RegressionError::InsufficientObservations {
                needed: 2,
                got: x.nrows(),
            });
        }
        Ok(())
    }

    fn standardize(&self, x: &Mat<f64>, y: &Col<f64>) -> Standardized {
        let n = x.nrows();
        let p = x.ncols();

        let (x_centered, x_means, y_centered, y_mean) = if self.options.with_intercept {
            let (xc, means) = center_columns(x);
            let (yc, ym) = center_vector(y);
            (xc, means, yc, ym)
        } else {
            (x.to_owned(), Col::zeros(p), y.clone(), 0.0)
        };

        let (xs, scales) = if self.options.standardize {
            scale_columns(&x_centered)
        } else {
            (x_centered, Col::from_fn(p, |_| 1.0))
        };

        let col_sq = (0..p)
            .map(|j| (0..n).map(|i| xs[(i, j)].powi(2)).sum())
            .collect();

        Standardized {
            x: xs,
            y: y_centered,
            x_means,
            x_scales: scales,
            y_mean,
            col_sq,
        }
    }

    /// Smallest penalty at which every coefficient is zero.
    pub fn lambda_max(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<f64, RegressionError> {
        Self::validate_input(x, y)?;
        let data = self.standardize(x, y);
        Ok(Self::lambda_max_standardized(&data))
    }

    fn lambda_max_standardized(data: &Standardized) -> f64 {
        let n = data.x.nrows();
        let max_corr = (0..data.x.ncols())
            .map(|j| {
                (0..n)
                    .map(|i| data.x[(i, j)] * data.y[i])
                    .sum::<f64>()
                    .abs()
            })
            .fold(0.0, f64::max);
        max_corr / n as f64
    }

    /// Fit the whole path, warm-starting each penalty from the previous one.
    ///
    /// `lambdas` should be sorted from largest to smallest.
    pub fn fit_path(
        &self,
        x: &Mat<f64>,
        y: &Col<f64>,
        lambdas: &[f64],
    ) -> Result<LassoPath, RegressionError> {
        Self::validate_input(x, y)?;
        let data = self.standardize(x, y);
        let p = x.ncols();

        let mut coefficients = Mat::zeros(p, lambdas.len());
        let mut intercepts = Vec::with_capacity(lambdas.len());

        let mut beta = Col::zeros(p);
        let mut residuals = data.y.clone();

        for (k, &lambda) in lambdas.iter().enumerate() {
            self.coordinate_descent(&data, lambda, &mut beta, &mut residuals);
            let (original, intercept) = Self::unstandardize(&data, &beta);
            for j in 0..p {
                coefficients[(j, k)] = original[j];
            }
            intercepts.push(intercept);
        }

        Ok(LassoPath {
            lambdas: lambdas.to_vec(),
            coefficients,
            intercepts,
        })
    }

    /// Coordinate descent from a warm start; updates `beta` and `residuals`
    /// in place.
    fn coordinate_descent(
        &self,
        data: &Standardized,
        lambda: f64,
        beta: &mut Col<f64>,
        residuals: &mut Col<f64>,
    ) {
        let n_samples = data.x.nrows();
        let n_features = data.x.ncols();
        // glmnet scaling: the coordinate update thresholds at n·λ
        let gamma = lambda * n_samples as f64;

        for iteration in 0..self.options.max_iterations {
            let mut max_change = 0.0f64;

            for j in 0..n_features {
                if data.col_sq[j] < 1e-14 {
                    continue;
                }
                let old_coef = beta[j];

                // rho = x_j' (r + x_j β_j)
                let mut rho = 0.0;
                for i in 0..n_samples {
                    rho += data.x[(i, j)] * residuals[i];
                }
                rho += data.col_sq[j] * old_coef;

                let new_coef = Self::soft_threshold(rho, gamma) / data.col_sq[j];

                let delta: f64 = new_coef - old_coef;
                if delta.abs() > 1e-14 {
                    for i in 0..n_samples {
                        residuals[i] -= data.x[(i, j)] * delta;
                    }
                }

                beta[j] = new_coef;
                max_change = max_change.max(delta.abs() * data.col_sq[j].sqrt());
            }

            if max_change < self.options.tolerance {
                return;
            }
            if iteration + 1 == self.options.max_iterations {
                log::debug!(
                    "coordinate descent stopped at max_iterations = {} (lambda = {:.4e}, change = {:.2e})",
                    self.options.max_iterations,
                    lambda,
                    max_change
                );
            }
        }
    }

    /// Map standardized coefficients back to the original scale.
    fn unstandardize(data: &Standardized, beta: &Col<f64>) -> (Col<f64>, f64) {
        let p = beta.nrows();
        let original = Col::from_fn(p, |j| {
            if beta[j].abs() > ZERO_TOLERANCE {
                beta[j] / data.x_scales[j]
            } else {
                0.0
            }
        });

        let mut intercept = data.y_mean;
        for j in 0..p {
            intercept -= data.x_means[j] * original[j];
        }
        (original, intercept)
    }
}
