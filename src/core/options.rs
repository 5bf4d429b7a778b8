//! Numerical settings shared by the OLS and lasso solvers.

/// Solver settings.
///
/// The lasso penalty itself is not stored here: the cross-validated selector
/// builds its own grid and hands every penalty to the path solver.
#[derive(Debug, Clone)]
pub struct RegressionOptions {
    /// Fit an unpenalized intercept (default: true).
    pub with_intercept: bool,
    /// Scale covariates to unit variance before penalizing (default: true).
    pub standardize: bool,
    /// Coordinate descent sweeps per penalty before giving up.
    pub max_iterations: usize,
    /// Largest scaled coefficient change that counts as converged.
    pub tolerance: f64,
    /// Relative threshold on the R diagonal below which a column is aliased.
    pub rank_tolerance: f64,
}

impl Default for RegressionOptions {
    fn default() -> Self {
        Self {
            with_intercept: true,
            standardize: true,
            max_iterations: 10_000,
            tolerance: 1e-7,
            rank_tolerance: 1e-10,
        }
    }
}
