//! Experiment configuration.
//!
//! An [`ExperimentConfig`] is built once (defaults, builder, or a TOML file),
//! validated, and then shared read-only by every trial.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Variance used for the masking arm's confidence intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskingVariance {
    /// CR2 cluster-robust sandwich, as for every other arm.
    #[default]
    ClusterRobust,
    /// Closed-form `(1 + τ⁻²)(XᵀX)⁻¹XᵀΣX(XᵀX)⁻¹` with the known noise level.
    KnownNoise,
}

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("n and p must be positive, got n = {n}, p = {p}")]
    InvalidDimension { n: usize, p: usize },

    #[error("beta has {got} entries but p = {expected}")]
    BetaLength { expected: usize, got: usize },

    #[error("alpha must be in (0, 1), got {0}")]
    InvalidAlpha(f64),

    #[error("sigma2 must be positive and finite, got {0}")]
    InvalidSigma2(f64),

    #[error("tau must be positive and finite, got {0}")]
    InvalidTau(f64),

    #[error("runs must be at least 1")]
    InvalidRuns,

    #[error("fold_count must be at least 2, got {0}")]
    InvalidFoldCount(usize),

    #[error("holdout must be in [1, n), got {0}")]
    InvalidHoldout(usize),

    #[error("n_lambda must be at least 2, got {0}")]
    InvalidLambdaCount(usize),

    #[error("leverage multipliers must be finite, got {0}")]
    InvalidMultiplier(f64),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Process-wide constants for one batch of simulations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    /// Base sample size before leverage rows are appended.
    pub n: usize,
    /// Number of covariates.
    pub p: usize,
    /// True coefficient vector, length `p`.
    pub beta: Vec<f64>,
    /// Noise variance σ².
    pub sigma2: f64,
    /// Miscoverage level; intervals have level `1 - alpha`.
    pub alpha: f64,
    /// One entry per leverage scenario, each a list of multipliers γ.
    pub scenarios: Vec<Vec<f64>>,
    /// Repetitions per scenario.
    pub runs: usize,
    /// Folds for the cross-validated lasso.
    pub fold_count: usize,
    /// Rows held out by the leave-k-out arm.
    pub holdout: usize,
    /// Fission noise scale τ.
    pub tau: f64,
    /// Variance estimator for the masking arm.
    pub masking_variance: MaskingVariance,
    /// Length of the lasso penalty grid.
    pub n_lambda: usize,
    /// Master seed for the whole batch.
    pub seed: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        let p = 20;
        let mut beta = vec![0.0; p];
        beta[0] = 1.0;
        beta[15] = 1.0;
        beta[16] = -1.0;
        beta[17] = 1.0;

        Self {
            n: 15,
            p,
            beta,
            sigma2: 1.0,
            alpha: 0.1,
            scenarios: vec![vec![], vec![2.0], vec![4.0], vec![6.0], vec![8.0]],
            runs: 500,
            fold_count: 5,
            holdout: 2,
            tau: 1.0,
            masking_variance: MaskingVariance::ClusterRobust,
            n_lambda: 100,
            seed: 2024,
        }
    }
}

impl ExperimentConfig {
    /// Create a builder starting from the calibration defaults.
    pub fn builder() -> ExperimentConfigBuilder {
        ExperimentConfigBuilder::default()
    }

    /// Parse and validate a TOML document. Missing keys take default values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Noise standard deviation σ.
    pub fn sd(&self) -> f64 {
        self.sigma2.sqrt()
    }

    /// Confidence level `1 - alpha`.
    pub fn confidence_level(&self) -> f64 {
        1.0 - self.alpha
    }

    /// Indices of nonzero entries of β.
    pub fn true_support(&self) -> Vec<usize> {
        self.beta
            .iter()
            .enumerate()
            .filter(|(_, &b)| b != 0.0)
            .map(|(j, _)| j)
            .collect()
    }

    /// Validate the configuration and return an error if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n == 0 || self.p == 0 {
            return Err(ConfigError::InvalidDimension {
                n: self.n,
                p: self.p,
            });
        }
        if self.beta.len() != self.p {
            return Err(ConfigError::BetaLength {
                expected: self.p,
                got: self.beta.len(),
            });
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(ConfigError::InvalidAlpha(self.alpha));
        }
        if !(self.sigma2 > 0.0 && self.sigma2.is_finite()) {
            return Err(ConfigError::InvalidSigma2(self.sigma2));
        }
        if !(self.tau > 0.0 && self.tau.is_finite()) {
            return Err(ConfigError::InvalidTau(self.tau));
        }
        if self.runs == 0 {
            return Err(ConfigError::InvalidRuns);
        }
        if self.fold_count < 2 {
            return Err(ConfigError::InvalidFoldCount(self.fold_count));
        }
        if self.holdout == 0 || self.holdout >= self.n {
            return Err(ConfigError::InvalidHoldout(self.holdout));
        }
        if self.n_lambda < 2 {
            return Err(ConfigError::InvalidLambdaCount(self.n_lambda));
        }
        if let Some(&bad) = self
            .scenarios
            .iter()
            .flatten()
            .find(|gamma| !gamma.is_finite())
        {
            return Err(ConfigError::InvalidMultiplier(bad));
        }
        Ok(())
    }
}

/// Builder for `ExperimentConfig`.
#[derive(Debug, Clone, Default)]
pub struct ExperimentConfigBuilder {
    config: ExperimentConfig,
}

impl ExperimentConfigBuilder {
    /// Create a new builder with the calibration defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base sample size.
    pub fn n(mut self, n: usize) -> Self {
        self.config.n = n;
        self
    }

    /// Set the coefficient vector; `p` follows its length.
    pub fn beta(mut self, beta: Vec<f64>) -> Self {
        self.config.p = beta.len();
        self.config.beta = beta;
        self
    }

    /// Set the noise variance.
    pub fn sigma2(mut self, sigma2: f64) -> Self {
        self.config.sigma2 = sigma2;
        self
    }

    /// Set the miscoverage level.
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.config.alpha = alpha;
        self
    }

    /// Set the leverage scenarios.
    pub fn scenarios(mut self, scenarios: Vec<Vec<f64>>) -> Self {
        self.config.scenarios = scenarios;
        self
    }

    /// Set the repetitions per scenario.
    pub fn runs(mut self, runs: usize) -> Self {
        self.config.runs = runs;
        self
    }

    /// Set the cross-validation fold count.
    pub fn fold_count(mut self, folds: usize) -> Self {
        self.config.fold_count = folds;
        self
    }

    /// Set the number of rows held out by the leave-k-out arm.
    pub fn holdout(mut self, holdout: usize) -> Self {
        self.config.holdout = holdout;
        self
    }

    /// Set the fission noise scale τ.
    pub fn tau(mut self, tau: f64) -> Self {
        self.config.tau = tau;
        self
    }

    /// Set the masking arm's variance estimator.
    pub fn masking_variance(mut self, variance: MaskingVariance) -> Self {
        self.config.masking_variance = variance;
        self
    }

    /// Set the penalty grid length.
    pub fn n_lambda(mut self, n_lambda: usize) -> Self {
        self.config.n_lambda = n_lambda;
        self
    }

    /// Set the master seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<ExperimentConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_calibration_setup() {
        let config = ExperimentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.true_support(), vec![0, 15, 16, 17]);
        assert_eq!(config.scenarios.len(), 5);
        assert!((config.confidence_level() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_builder_tracks_p() {
        let config = ExperimentConfig::builder()
            .beta(vec![1.0, 0.0, 0.0])
            .n(10)
            .build()
            .expect("valid config");
        assert_eq!(config.p, 3);
        assert_eq!(config.true_support(), vec![0]);
    }

    #[test]
    fn test_validation_errors() {
        let result = ExperimentConfig::builder().alpha(0.0).build();
        assert!(matches!(result, Err(ConfigError::InvalidAlpha(_))));

        let result = ExperimentConfig::builder().fold_count(1).build();
        assert!(matches!(result, Err(ConfigError::InvalidFoldCount(1))));

        let result = ExperimentConfig::builder().holdout(15).build();
        assert!(matches!(result, Err(ConfigError::InvalidHoldout(15))));

        let result = ExperimentConfig::builder()
            .scenarios(vec![vec![f64::INFINITY]])
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidMultiplier(_))));
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let config = ExperimentConfig::from_toml_str(
            r#"
            runs = 20
            alpha = 0.2
            scenarios = [[], [6.0]]
            masking_variance = "known_noise"
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.runs, 20);
        assert_eq!(config.n, 15);
        assert_eq!(config.scenarios, vec![vec![], vec![6.0]]);
        assert_eq!(config.masking_variance, MaskingVariance::KnownNoise);
    }

    #[test]
    fn test_toml_rejects_wrong_beta_length() {
        let result = ExperimentConfig::from_toml_str("beta = [1.0, 2.0]");
        assert!(matches!(result, Err(ConfigError::BetaLength { .. })));
    }

    #[test]
    fn test_toml_rejects_unknown_keys() {
        let result = ExperimentConfig::from_toml_str("folds = 3");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
