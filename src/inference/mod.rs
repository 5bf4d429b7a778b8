//! Statistical inference for selected models: CR2 sandwich intervals, the
//! closed-form fission intervals, and projected targets.

mod cluster_robust;
mod coefficient;
mod fission;
mod projection;

pub use cluster_robust::{cr2_covariance, ClusterRobustInference, InferenceResult};
pub use coefficient::{CoefficientInference, ConfidenceInterval};
pub use fission::{fission_covariance, fission_intervals};
pub use projection::projected_target;
