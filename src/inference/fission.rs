//! Closed-form intervals for data fission with Gaussian noise.
//!
//! With `f(Y) = Y + τZ` and `g(Y) = Y - Z/τ`, `Z ~ N(0, Σ)`, the two copies are
//! independent and for any model `M` chosen from `f(Y)`:
//!
//! β̂(M) = (X_M'X_M)⁻¹X_M' g(Y) ~ N(β*(M), (1 + τ⁻²)(X_M'X_M)⁻¹X_M'ΣX_M(X_M'X_M)⁻¹)
//!
//! so the interval for coordinate k is β̂_k ± z_{α/2} sqrt of the k-th
//! diagonal entry of that covariance.

use crate::inference::cluster_robust::{ClusterRobustInference, InferenceResult};
use crate::solvers::{OlsRegressor, RegressionError, Regressor};
use crate::utils::augment_intercept;
use faer::{Col, Mat};

/// `(1 + τ⁻²) B X'ΣX B` with `B = (X'X)⁻¹`.
///
/// `noise_cov` is the `n × n` covariance of the original response noise.
pub fn fission_covariance(
    design: &Mat<f64>,
    xtx_inv: &Mat<f64>,
    noise_cov: &Mat<f64>,
    tau: f64,
) -> Mat<f64> {
    let inflation = 1.0 + 1.0 / (tau * tau);
    let xt_sigma = design.transpose() * noise_cov;
    let meat = &xt_sigma * design;
    let left = xtx_inv * &meat;
    let sandwich = &left * xtx_inv;
    Mat::from_fn(sandwich.nrows(), sandwich.ncols(), |a, b| {
        inflation * sandwich[(a, b)]
    })
}

/// Fit `g ~ 1 + x_restricted` and form intervals from the known noise level.
///
/// `sd` is the standard deviation of the original response noise (so
/// `Σ = sd² I`) and `tau` the fission scale used to build `g`.
pub fn fission_intervals(
    x_restricted: &Mat<f64>,
    g: &Col<f64>,
    sd: f64,
    tau: f64,
    level: f64,
) -> Result<InferenceResult, RegressionError> {
    if x_restricted.ncols() == 0 {
        return Err(RegressionError::InvalidConfiguration(
            "inference requires at least one selected column".into(),
        ));
    }
    if !(tau > 0.0 && tau.is_finite()) {
        return Err(RegressionError::InvalidConfiguration(format!(
            "tau must be positive, got {}",
            tau
        )));
    }

    let fitted = OlsRegressor::builder()
        .with_intercept(true)
        .build()
        .fit(x_restricted, g)?;
    let xtx_inv = fitted
        .xtx_inverse()
        .ok_or(RegressionError::SingularMatrix)?;

    let n = x_restricted.nrows();
    let variance = sd * sd;
    let noise_cov = Mat::from_fn(n, n, |i, j| if i == j { variance } else { 0.0 });
    let design = augment_intercept(x_restricted);
    let covariance = fission_covariance(&design, xtx_inv, &noise_cov, tau);

    ClusterRobustInference::assemble(fitted.parameters(), covariance, level)
}
