//! Monte Carlo study of post-selection inference with data fission.
//!
//! A cross-validated lasso picks a model and OLS with CR2 cluster-robust
//! standard errors builds intervals for it. Five strategies decide which
//! data each step sees: masking (data fission with Gaussian noise), full
//! reuse, a random split, a larger-half split and a leave-k-out holdout.
//! Each is scored on power, precision, false coverage rate and interval
//! length as high-leverage rows are appended to the design.
//!
//! # Example
//!
//! ```rust,ignore
//! use fission_rs::prelude::*;
//!
//! let config = ExperimentConfig::builder()
//!     .runs(100)
//!     .scenarios(vec![vec![], vec![4.0]])
//!     .build()?;
//!
//! let records = run_experiment(&config);
//! for summary in summarize(&records, &config.true_support()) {
//!     println!("{} {:?}: FCR = {:.3}", summary.arm, summary.multipliers, summary.false_coverage_rate);
//! }
//! ```

pub mod core;
pub mod diagnostics;
pub mod inference;
pub mod simulation;
pub mod solvers;
pub mod utils;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::{
        Clusters, ConfigError, Dataset, ExperimentConfig, ExperimentConfigBuilder, MaskingVariance,
        RegressionOptions, RegressionResult,
    };
    pub use crate::diagnostics::{compute_leverage, hat_block};
    pub use crate::inference::{
        fission_intervals, projected_target, ClusterRobustInference, ConfidenceInterval,
        InferenceResult,
    };
    pub use crate::simulation::{
        generate, run_experiment, run_trial, summarize, AbsenceReason, Arm, ArmOutcome,
        ArmResult, ArmSummary, TrialRecord, Uninferred,
    };
    pub use crate::solvers::{
        CvLassoFit, CvLassoSelector, FittedRegressor, LassoRegressor, OlsRegressor,
        RegressionError, Regressor,
    };
}

pub use crate::core::{ExperimentConfig, MaskingVariance};
pub use crate::simulation::{run_experiment, summarize, Arm, ArmOutcome, ArmSummary, TrialRecord};
