//! Core types for the simulation: options, configuration, datasets, results.

mod config;
mod dataset;
mod options;
mod result;

pub use config::{ConfigError, ExperimentConfig, ExperimentConfigBuilder, MaskingVariance};
pub use dataset::{Clusters, Dataset};
pub use options::RegressionOptions;
pub use result::RegressionResult;
