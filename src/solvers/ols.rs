//! Ordinary Least Squares regression solver.

use crate::core::{RegressionOptions, RegressionResult};
use crate::solvers::traits::{FittedRegressor, RegressionError, Regressor};
use crate::utils::{
    augment_intercept, center_columns, center_vector, detect_constant_columns, invert_matrix,
};
use faer::{Col, Mat};

/// Ordinary Least Squares regression estimator.
///
/// Uses QR decomposition with column pivoting to handle rank-deficient matrices.
/// Aliased (collinear) coefficients are set to NaN.
///
/// The fit keeps `(X'X)⁻¹` of the intercept-augmented design so the
/// sandwich estimators can reuse it:
///
/// ```rust,ignore
/// use fission_rs::solvers::{FittedRegressor, OlsRegressor, RegressionError, Regressor};
///
/// let fitted = OlsRegressor::builder().build().fit(&x_selected, &y)?;
/// let bread = fitted.xtx_inverse().ok_or(RegressionError::SingularMatrix)?;
/// let params = fitted.parameters(); // [b0, b_1, ..., b_k]
/// let residuals = &fitted.result().residuals;
/// ```
#[derive(Debug, Clone)]
pub struct OlsRegressor {
    options: RegressionOptions,
}

impl OlsRegressor {
    /// Create a new OLS regressor with the given options.
    pub fn new(options: RegressionOptions) -> Self {
        Self { options }
    }

    /// Create a builder for configuring the regressor.
    pub fn builder() -> OlsRegressorBuilder {
        OlsRegressorBuilder::default()
    }
}

impl Regressor for OlsRegressor {
    type Fitted = FittedOls;

    fn fit(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<Self::Fitted, RegressionError> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if x.nrows() != y.nrows() {
            return Err(RegressionError::DimensionMismatch {
                x_rows: x.nrows(),
                y_len: y.nrows(),
            });
        }

        let n_params = if self.options.with_intercept {
            n_features + 1
        } else {
            n_features
        };

        // Exact fits (n_params = n_samples) are allowed here; callers that
        // need residual degrees of freedom check for themselves.
        if n_samples < n_params.max(1) {
            return Err(RegressionError::InsufficientObservations {
                needed: n_params.max(1),
                got: n_samples,
            });
        }

        let constant_cols = detect_constant_columns(x, self.options.rank_tolerance);

        let (coefficients, intercept, aliased, rank) = if self.options.with_intercept {
            let (x_centered, x_means) = center_columns(x);
            let (y_centered, y_mean) = center_vector(y);

            let (coefficients, aliased, rank) =
                self.solve_with_qr(&x_centered, &y_centered, &constant_cols)?;

            // intercept = y_mean - x_means' * coefficients
            let mut intercept = y_mean;
            for j in 0..n_features {
                if !aliased[j] {
                    intercept -= x_means[j] * coefficients[j];
                }
            }
            (coefficients, Some(intercept), aliased, rank)
        } else {
            let (coefficients, aliased, rank) = self.solve_with_qr(x, y, &constant_cols)?;
            (coefficients, None, aliased, rank)
        };

        let mut fitted_values = Col::zeros(n_samples);
        let mut residuals = Col::zeros(n_samples);
        for i in 0..n_samples {
            let mut pred = intercept.unwrap_or(0.0);
            for j in 0..n_features {
                if !aliased[j] {
                    pred += x[(i, j)] * coefficients[j];
                }
            }
            fitted_values[i] = pred;
            residuals[i] = y[i] - pred;
        }

        let n_params = rank + usize::from(intercept.is_some());
        let mut result = RegressionResult::empty(n_features, n_samples);
        result.coefficients = coefficients;
        result.intercept = intercept;
        result.residuals = residuals;
        result.fitted_values = fitted_values;
        result.rank = rank;
        result.n_parameters = n_params;
        result.aliased = aliased;

        // (X'X)⁻¹ of the design actually fitted, kept for sandwich estimators
        let design = if self.options.with_intercept {
            augment_intercept(x)
        } else {
            x.to_owned()
        };
        let xtx = design.transpose() * &design;
        let xtx_inverse = if result.has_aliased() {
            None
        } else {
            invert_matrix(&xtx, self.options.rank_tolerance)
        };

        Ok(FittedOls {
            result,
            xtx_inverse,
        })
    }
}

impl OlsRegressor {
    /// Solve the least squares problem using QR decomposition with column pivoting.
    fn solve_with_qr(
        &self,
        x: &Mat<f64>,
        y: &Col<f64>,
        constant_cols: &[bool],
    ) -> Result<(Col<f64>, Vec<bool>, usize), RegressionError> {
        let n_features = x.ncols();
        let n_samples = x.nrows();

        let mut aliased = constant_cols.to_vec();

        if n_features == 0 {
            return Ok((Col::zeros(0), aliased, 0));
        }

        let qr = x.col_piv_qr();
        let q = qr.compute_Q();
        let r = qr.R();
        let perm = qr.P();

        // pivot[i] = original column at position i (X P = Q R);
        // perm_inv[j] = position of original column j after pivoting
        let pivot = perm.arrays().0;
        let mut perm_inv: Vec<usize> = vec![0; n_features];
        for (position, &column) in pivot.iter().enumerate().take(n_features) {
            perm_inv[column] = position;
        }

        // Numerical rank from the R diagonal, relative to its leading entry
        let r_lead = r[(0, 0)].abs();
        let mut rank = 0;
        for i in 0..n_features.min(n_samples) {
            if r[(i, i)].abs() > self.options.rank_tolerance * r_lead.max(1.0) {
                rank += 1;
            } else {
                break;
            }
        }

        if rank == 0 {
            let coefficients = Col::from_fn(n_features, |_| f64::NAN);
            return Ok((coefficients, vec![true; n_features], 0));
        }

        for j in 0..n_features {
            if constant_cols[j] || perm_inv[j] >= rank {
                aliased[j] = true;
            }
        }

        let qty = q.transpose() * y;

        // Back-substitution for the leading rank × rank block of R
        let mut beta_reduced = Col::zeros(rank);
        for i in (0..rank).rev() {
            let mut sum = qty[i];
            for j in (i + 1)..rank {
                sum -= r[(i, j)] * beta_reduced[j];
            }
            beta_reduced[i] = sum / r[(i, i)];
        }

        let coefficients = Col::from_fn(n_features, |j| {
            if aliased[j] {
                f64::NAN
            } else {
                beta_reduced[perm_inv[j]]
            }
        });

        Ok((coefficients, aliased, rank))
    }
}

/// A fitted OLS regression model.
#[derive(Debug, Clone)]
pub struct FittedOls {
    result: RegressionResult,
    /// (X'X)⁻¹ or (X_aug'X_aug)⁻¹; absent for rank-deficient fits.
    xtx_inverse: Option<Mat<f64>>,
}

impl FittedOls {
    /// `(X'X)⁻¹` of the fitted design (with the intercept column first when
    /// present). `None` if the design was rank deficient.
    pub fn xtx_inverse(&self) -> Option<&Mat<f64>> {
        self.xtx_inverse.as_ref()
    }

    /// Full parameter vector `[intercept, coefficients...]` (intercept only
    /// when fitted).
    pub fn parameters(&self) -> Col<f64> {
        let coefs = &self.result.coefficients;
        match self.result.intercept {
            Some(b0) => Col::from_fn(coefs.nrows() + 1, |k| if k == 0 { b0 } else { coefs[k - 1] }),
            None => coefs.clone(),
        }
    }
}

impl FittedRegressor for FittedOls {
    fn predict(&self, x: &Mat<f64>) -> Col<f64> {
        let n_samples = x.nrows();
        let n_features = x.ncols();
        let intercept = self.result.intercept.unwrap_or(0.0);

        Col::from_fn(n_samples, |i| {
            let mut pred = intercept;
            for j in 0..n_features {
                if !self.result.aliased[j] {
                    pred += x[(i, j)] * self.result.coefficients[j];
                }
            }
            pred
        })
    }

    fn result(&self) -> &RegressionResult {
        &self.result
    }
}

/// Builder for `OlsRegressor`.
#[derive(Debug, Clone, Default)]
pub struct OlsRegressorBuilder {
    options: RegressionOptions,
}

impl OlsRegressorBuilder {
    /// Whether the design gets an intercept column.
    pub fn with_intercept(mut self, include: bool) -> Self {
        self.options.with_intercept = include;
        self
    }

    pub fn build(self) -> OlsRegressor {
        OlsRegressor::new(self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_fit() {
        let x = Mat::from_fn(5, 1, |i, _| i as f64);
        let y = Col::from_fn(5, |i| 2.0 + 3.0 * i as f64);

        let model = OlsRegressor::builder().with_intercept(true).build();
        let fitted = model.fit(&x, &y).expect("model should fit");

        assert!((fitted.coefficients()[0] - 3.0).abs() < 1e-10);
        assert!((fitted.intercept().expect("intercept exists") - 2.0).abs() < 1e-10);
        assert!(fitted.xtx_inverse().is_some());
    }

    #[test]
    fn test_predict() {
        let x = Mat::from_fn(5, 1, |i, _| i as f64);
        let y = Col::from_fn(5, |i| 2.0 + 3.0 * i as f64);

        let fitted = OlsRegressor::builder().build().fit(&x, &y).expect("model should fit");

        let x_new = Mat::from_fn(2, 1, |i, _| (i + 10) as f64);
        let preds = fitted.predict(&x_new);

        assert!((preds[0] - 32.0).abs() < 1e-10);
        assert!((preds[1] - 35.0).abs() < 1e-10);
    }

    #[test]
    fn test_collinear_columns_are_aliased() {
        let x = Mat::from_fn(10, 2, |i, j| if j == 0 { i as f64 } else { 2.0 * i as f64 });
        let y = Col::from_fn(10, |i| 1.0 + i as f64);

        let fitted = OlsRegressor::builder().build().fit(&x, &y).expect("model should fit");

        assert!(fitted.result().has_aliased());
        assert!(fitted.xtx_inverse().is_none());
    }

    #[test]
    fn test_too_few_rows() {
        let x = Mat::from_fn(2, 3, |i, j| (i + j) as f64);
        let y = Col::from_fn(2, |i| i as f64);

        let result = OlsRegressor::builder().build().fit(&x, &y);
        assert!(matches!(
            result,
            Err(RegressionError::InsufficientObservations { needed: 4, got: 2 })
        ));
    }

    #[test]
    fn test_parameters_prepend_intercept() {
        let x = Mat::from_fn(6, 1, |i, _| i as f64);
        let y = Col::from_fn(6, |i| -1.0 + 0.5 * i as f64);

        let fitted = OlsRegressor::builder().build().fit(&x, &y).expect("model should fit");
        let params = fitted.parameters();

        assert_eq!(params.nrows(), 2);
        assert!((params[0] + 1.0).abs() < 1e-10);
        assert!((params[1] - 0.5).abs() < 1e-10);
    }
}
