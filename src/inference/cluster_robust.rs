//! OLS with CR2 cluster-robust standard errors.
//!
//! The covariance follows Bell and McCaffrey's bias-reduced linearization:
//!
//! V = B (Σ_g X_g' A_g e_g e_g' A_g X_g) B,  B = (X'X)⁻¹,  A_g = (I - H_gg)^(-1/2)
//!
//! where `H_gg` is the block of the hat matrix belonging to cluster `g`.
//! With one observation per cluster this reduces to HC2.

use crate::core::Clusters;
use crate::diagnostics::hat_block;
use crate::inference::coefficient::CoefficientInference;
use crate::solvers::{FittedRegressor, OlsRegressor, RegressionError, Regressor};
use crate::utils::augment_intercept;
use faer::{Col, Mat, Side};

/// Eigenvalues of `I - H_gg` at or below this are treated as singular.
const EIGEN_TOLERANCE: f64 = 1e-10;

/// Estimates and intervals for the columns of a restricted design.
///
/// Vectors are aligned with the columns of the design passed to
/// [`ClusterRobustInference::infer`]; the intercept is reported separately.
#[derive(Debug, Clone)]
pub struct InferenceResult {
    /// OLS slope estimates.
    pub estimates: Col<f64>,
    /// OLS intercept.
    pub intercept: f64,
    /// Standard errors of the slopes.
    pub std_errors: Col<f64>,
    /// Lower interval bounds.
    pub lower: Col<f64>,
    /// Upper interval bounds.
    pub upper: Col<f64>,
    /// Covariance over `[intercept, slopes...]`.
    pub covariance: Mat<f64>,
}

/// Symmetric inverse square root `M^(-1/2)` of a positive definite matrix.
fn inverse_sqrt(m: &Mat<f64>) -> Result<Mat<f64>, RegressionError> {
    let k = m.nrows();
    if k == 1 {
        let v = m[(0, 0)];
        if v <= EIGEN_TOLERANCE {
            return Err(RegressionError::NumericalError(format!(
                "observation has leverage {:.6}; CR2 adjustment undefined",
                1.0 - v
            )));
        }
        return Ok(Mat::from_fn(1, 1, |_, _| 1.0 / v.sqrt()));
    }

    let evd = m
        .as_ref()
        .self_adjoint_eigen(Side::Lower)
        .map_err(|e| RegressionError::NumericalError(format!("eigendecomposition failed: {e:?}")))?;
    let values = evd.S().column_vector().as_mat();
    let vectors = evd.U();

    let mut scale = vec![0.0; k];
    for i in 0..k {
        let v = values[(i, 0)];
        if v <= EIGEN_TOLERANCE {
            return Err(RegressionError::NumericalError(format!(
                "cluster block I - H has eigenvalue {:.3e}; CR2 adjustment undefined",
                v
            )));
        }
        scale[i] = 1.0 / v.sqrt();
    }

    Ok(Mat::from_fn(k, k, |a, b| {
        (0..k)
            .map(|i| vectors[(a, i)] * scale[i] * vectors[(b, i)])
            .sum()
    }))
}

/// CR2 sandwich covariance for an already fitted design.
///
/// `design` includes the intercept column if one was fitted; `xtx_inv` is
/// `(design' design)⁻¹` and `residuals` are the OLS residuals.
pub fn cr2_covariance(
    design: &Mat<f64>,
    residuals: &Col<f64>,
    xtx_inv: &Mat<f64>,
    clusters: &Clusters,
) -> Result<Mat<f64>, RegressionError> {
    let q = design.ncols();
    let mut meat = Mat::<f64>::zeros(q, q);

    for rows in clusters.groups() {
        let h = hat_block(design, xtx_inv, &rows);
        let identity_minus_h = Mat::from_fn(rows.len(), rows.len(), |a, b| {
            let delta = if a == b { 1.0 } else { 0.0 };
            delta - h[(a, b)]
        });
        let adjust = inverse_sqrt(&identity_minus_h)?;

        // u_g = X_g' A_g e_g
        let adjusted: Vec<f64> = (0..rows.len())
            .map(|a| {
                (0..rows.len())
                    .map(|b| adjust[(a, b)] * residuals[rows[b]])
                    .sum()
            })
            .collect();
        let u = Col::from_fn(q, |c| {
            rows.iter()
                .zip(&adjusted)
                .map(|(&r, &v)| design[(r, c)] * v)
                .sum::<f64>()
        });

        for a in 0..q {
            for b in 0..q {
                meat[(a, b)] += u[a] * u[b];
            }
        }
    }

    let left = xtx_inv * &meat;
    Ok(&left * xtx_inv)
}

/// OLS fit plus CR2 intervals at a given level.
pub struct ClusterRobustInference;

impl ClusterRobustInference {
    /// Fit `y ~ 1 + x_restricted` and return CR2 normal intervals for every
    /// column of `x_restricted`.
    ///
    /// Stale cluster labels are replaced by singletons when there are fewer
    /// rows than clusters. Zero columns is a caller error: empty selections
    /// must be handled before inference.
    pub fn infer(
        x_restricted: &Mat<f64>,
        y: &Col<f64>,
        clusters: &Clusters,
        level: f64,
    ) -> Result<InferenceResult, RegressionError> {
        if x_restricted.ncols() == 0 {
            return Err(RegressionError::InvalidConfiguration(
                "inference requires at least one selected column".into(),
            ));
        }
        let n_rows = x_restricted.nrows();
        let clusters = if clusters.len() != n_rows || n_rows < clusters.n_clusters() {
            Clusters::singletons(n_rows)
        } else {
            clusters.clone()
        };

        let fitted = OlsRegressor::builder()
            .with_intercept(true)
            .build()
            .fit(x_restricted, y)?;
        let xtx_inv = fitted
            .xtx_inverse()
            .ok_or(RegressionError::SingularMatrix)?
            .clone();

        let design = augment_intercept(x_restricted);
        let covariance = cr2_covariance(&design, &fitted.result().residuals, &xtx_inv, &clusters)?;

        Self::assemble(fitted.parameters(), covariance, level)
    }

    /// Split a `[intercept, slopes...]` estimate and covariance into the
    /// slope intervals.
    pub(crate) fn assemble(
        parameters: Col<f64>,
        covariance: Mat<f64>,
        level: f64,
    ) -> Result<InferenceResult, RegressionError> {
        let k = parameters.nrows() - 1;
        let all_se = CoefficientInference::standard_errors(&covariance);
        if all_se.iter().any(|se| !se.is_finite()) {
            return Err(RegressionError::NumericalError(
                "non-finite standard error".into(),
            ));
        }

        let estimates = Col::from_fn(k, |j| parameters[j + 1]);
        let std_errors = Col::from_fn(k, |j| all_se[j + 1]);
        let (lower, upper) =
            CoefficientInference::confidence_intervals(&estimates, &std_errors, level)?;

        Ok(InferenceResult {
            intercept: parameters[0],
            estimates,
            std_errors,
            lower,
            upper,
            covariance,
        })
    }
}
