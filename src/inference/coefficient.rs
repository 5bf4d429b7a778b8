//! Coefficient inference calculations.

use crate::solvers::RegressionError;
use faer::{Col, Mat};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Two-sided interval for one selected coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Feature index in the full design.
    pub feature: usize,
    /// Point estimate.
    pub estimate: f64,
    /// Lower bound.
    pub lower: f64,
    /// Upper bound.
    pub upper: f64,
}

impl ConfidenceInterval {
    /// Interval width.
    pub fn length(&self) -> f64 {
        self.upper - self.lower
    }

    /// Whether `value` lies inside the closed interval.
    pub fn covers(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// Computes inference statistics for regression coefficients.
pub struct CoefficientInference;

impl CoefficientInference {
    /// Two-sided standard normal critical value z_{1-α/2} for `level = 1 - α`.
    pub fn normal_critical_value(level: f64) -> Result<f64, RegressionError> {
        if !(level > 0.0 && level < 1.0) {
            return Err(RegressionError::InvalidConfiguration(format!(
                "confidence level must be in (0, 1), got {}",
                level
            )));
        }
        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| RegressionError::NumericalError(e.to_string()))?;
        Ok(normal.inverse_cdf(1.0 - (1.0 - level) / 2.0))
    }

    /// Standard errors from the diagonal of a covariance matrix.
    ///
    /// Negative variances (numerical noise) yield NaN.
    pub fn standard_errors(covariance: &Mat<f64>) -> Col<f64> {
        Col::from_fn(covariance.nrows(), |j| {
            let var = covariance[(j, j)];
            if var >= 0.0 {
                var.sqrt()
            } else {
                f64::NAN
            }
        })
    }

    /// Compute confidence intervals for coefficients.
    ///
    /// CI_j = β_j ± z_{α/2} * SE(β_j)
    pub fn confidence_intervals(
        estimates: &Col<f64>,
        std_errors: &Col<f64>,
        level: f64,
    ) -> Result<(Col<f64>, Col<f64>), RegressionError> {
        let z = Self::normal_critical_value(level)?;
        let n = estimates.nrows();

        let lower = Col::from_fn(n, |j| estimates[j] - z * std_errors[j]);
        let upper = Col::from_fn(n, |j| estimates[j] + z * std_errors[j]);
        Ok((lower, upper))
    }
}
