//! Monte Carlo comparison of select-then-infer strategies under leverage.

mod aggregate;
mod arms;
mod generator;
mod runner;

pub use aggregate::{summarize, ArmSummary};
pub use arms::{AbsenceReason, Arm, ArmOutcome, ArmResult, ArmRunner, Partition, Uninferred};
pub use generator::generate;
pub use runner::{run_experiment, run_trial, TrialRecord};
