//! Experiment configuration loading and validation.

use fission_rs::core::{ConfigError, ExperimentConfig, MaskingVariance};
use std::io::Write;

#[test]
fn test_defaults_are_calibration_setup() {
    let config = ExperimentConfig::default();
    assert_eq!((config.n, config.p), (15, 20));
    assert_eq!(config.true_support(), vec![0, 15, 16, 17]);
    assert_eq!(config.scenarios.len(), 5);
    assert_eq!(config.fold_count, 5);
    assert_eq!(config.masking_variance, MaskingVariance::ClusterRobust);
    assert!(config.validate().is_ok());
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        r#"
runs = 25
seed = 7
tau = 2.0
masking_variance = "known_noise"
scenarios = [[], [3.0, 3.0]]
"#
    )
    .expect("write");

    let config = ExperimentConfig::from_path(file.path()).expect("valid config");
    assert_eq!(config.runs, 25);
    assert_eq!(config.seed, 7);
    assert_eq!(config.tau, 2.0);
    assert_eq!(config.masking_variance, MaskingVariance::KnownNoise);
    assert_eq!(config.scenarios, vec![vec![], vec![3.0, 3.0]]);
    // untouched keys keep their defaults
    assert_eq!(config.n, 15);
}

#[test]
fn test_unknown_key_is_rejected() {
    let result = ExperimentConfig::from_toml_str("folds = 3\n");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_missing_file_is_io_error() {
    let result = ExperimentConfig::from_path("/nonexistent/fission.toml");
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn test_builder_validation() {
    assert!(matches!(
        ExperimentConfig::builder().alpha(1.5).build(),
        Err(ConfigError::InvalidAlpha(_))
    ));
    assert!(matches!(
        ExperimentConfig::builder().holdout(15).build(),
        Err(ConfigError::InvalidHoldout(15))
    ));
    assert!(matches!(
        ExperimentConfig::builder().tau(0.0).build(),
        Err(ConfigError::InvalidTau(_))
    ));
    assert!(matches!(
        ExperimentConfig::builder()
            .scenarios(vec![vec![f64::INFINITY]])
            .build(),
        Err(ConfigError::InvalidMultiplier(_))
    ));
}

#[test]
fn test_beta_sets_dimension() {
    let config = ExperimentConfig::builder()
        .beta(vec![1.0, 0.0, 2.0])
        .build()
        .expect("valid");
    assert_eq!(config.p, 3);
    assert_eq!(config.true_support(), vec![0, 2]);
}
