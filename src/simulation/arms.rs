//! The five select-then-infer strategies compared by the experiment.
//!
//! Every arm picks a model with the cross-validated lasso on one view of the
//! data and builds intervals for the selected coefficients on another:
//!
//! - `masking`: select on `y + τε'`, infer on `y - ε'/τ`, `ε' ~ N(0, σ²I)`
//! - `full`: select and infer on the same data
//! - `split`: a fair coin sends each row to selection or inference
//! - `mysplit`: the same coin flips, with the halves swapped when the
//!   selection half is the smaller one
//! - `loocv`: select on all but `holdout` random rows, infer on those rows

use crate::core::{Clusters, Dataset, ExperimentConfig, MaskingVariance};
use crate::diagnostics::compute_leverage;
use crate::inference::{
    fission_intervals, projected_target, ClusterRobustInference, ConfidenceInterval,
    InferenceResult,
};
use crate::solvers::{CvLassoSelector, RegressionError};
use crate::utils::select_columns;
use faer::{Col, Mat};
use rand::seq::index::sample;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A selection/inference strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arm {
    Masking,
    Full,
    Split,
    MySplit,
    Loocv,
}

impl Arm {
    /// Every arm, in reporting order.
    pub const ALL: [Arm; 5] = [Arm::Masking, Arm::Full, Arm::Split, Arm::MySplit, Arm::Loocv];

    /// Short lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Arm::Masking => "masking",
            Arm::Full => "full",
            Arm::Split => "split",
            Arm::MySplit => "mysplit",
            Arm::Loocv => "loocv",
        }
    }
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why an arm produced no intervals in a trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "message", rename_all = "snake_case")]
pub enum AbsenceReason {
    /// The lasso selected no feature.
    EmptySelection,
    /// The arm's setup is invalid for this sample, e.g. fewer rows than folds.
    InvalidConfiguration(String),
    /// The inference fit was singular or under-determined.
    NumericalFailure(String),
    /// The whole trial panicked.
    TrialFailed(String),
}

impl AbsenceReason {
    fn from_error(err: RegressionError) -> Self {
        if err.is_configuration() {
            AbsenceReason::InvalidConfiguration(err.to_string())
        } else {
            AbsenceReason::NumericalFailure(err.to_string())
        }
    }
}

/// Selected model, its intervals and the targets they should cover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmResult {
    /// Sorted selected feature indices, never empty.
    pub selected: Vec<usize>,
    /// One interval per selected feature, in the order of `selected`.
    pub intervals: Vec<ConfidenceInterval>,
    /// Projected coefficients β*(M), aligned with `selected`.
    pub projected: Vec<f64>,
}

impl ArmResult {
    /// Number of intervals that miss their projected target.
    pub fn non_covering(&self) -> usize {
        self.intervals
            .iter()
            .zip(&self.projected)
            .filter(|(ci, &target)| !ci.covers(target))
            .count()
    }
}

/// A non-empty selection whose inference fit failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Uninferred {
    /// Sorted selected feature indices, never empty.
    pub selected: Vec<usize>,
    /// Projected coefficients β*(M), aligned with `selected`.
    pub projected: Vec<f64>,
    /// Why no intervals could be built.
    pub reason: AbsenceReason,
}

/// Outcome of one arm in one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmOutcome {
    /// Selection and intervals.
    Present(ArmResult),
    /// Selection only. Counts toward power and precision, not coverage.
    Uninferred(Uninferred),
    /// Nothing usable.
    Absent(AbsenceReason),
}

impl ArmOutcome {
    /// The result, if the arm produced intervals.
    pub fn result(&self) -> Option<&ArmResult> {
        match self {
            ArmOutcome::Present(result) => Some(result),
            _ => None,
        }
    }

    /// The selected features, whether or not inference succeeded.
    pub fn selected(&self) -> Option<&[usize]> {
        match self {
            ArmOutcome::Present(result) => Some(&result.selected),
            ArmOutcome::Uninferred(partial) => Some(&partial.selected),
            ArmOutcome::Absent(_) => None,
        }
    }

    /// Whether intervals were produced.
    pub fn is_present(&self) -> bool {
        matches!(self, ArmOutcome::Present(_))
    }

    /// Whether the arm was absent because nothing was selected.
    pub fn is_empty_selection(&self) -> bool {
        matches!(self, ArmOutcome::Absent(AbsenceReason::EmptySelection))
    }
}

/// Row assignment to the selection and inference stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub selection: Vec<usize>,
    pub inference: Vec<usize>,
}

impl Partition {
    /// Independent fair coin per row; heads go to selection.
    pub fn coin_flip<R: Rng + ?Sized>(n_rows: usize, rng: &mut R) -> Self {
        let mut selection = Vec::new();
        let mut inference = Vec::new();
        for row in 0..n_rows {
            if rng.gen_bool(0.5) {
                selection.push(row);
            } else {
                inference.push(row);
            }
        }
        Self {
            selection,
            inference,
        }
    }

    /// Swap the halves when the selection half holds fewer than
    /// `n_rows / 2` rows.
    pub fn larger_selection(&self) -> Self {
        let n_rows = self.selection.len() + self.inference.len();
        if (self.selection.len() as f64) < n_rows as f64 / 2.0 {
            Self {
                selection: self.inference.clone(),
                inference: self.selection.clone(),
            }
        } else {
            self.clone()
        }
    }

    /// `holdout` distinct random rows for inference, the rest for selection.
    pub fn holdout<R: Rng + ?Sized>(n_rows: usize, holdout: usize, rng: &mut R) -> Self {
        let k = holdout.min(n_rows);
        let mut inference = sample(rng, n_rows, k).into_vec();
        inference.sort_unstable();
        let selection = (0..n_rows).filter(|r| !inference.contains(r)).collect();
        Self {
            selection,
            inference,
        }
    }
}

/// Rows, response and clusters for one stage.
struct Stage {
    x: Mat<f64>,
    y: Col<f64>,
    clusters: Clusters,
}

impl Stage {
    fn whole(data: &Dataset, y: Col<f64>) -> Self {
        Self {
            x: data.x.clone(),
            y,
            clusters: data.clusters.clone(),
        }
    }

    fn rows(data: &Dataset, rows: &[usize]) -> Self {
        let (x, y, clusters) = data.subset(rows);
        Self { x, y, clusters }
    }
}

/// Runs arms against one dataset.
///
/// The partition is drawn by the caller so that `split` and `mysplit` see
/// the same coin flips.
pub struct ArmRunner<'a> {
    config: &'a ExperimentConfig,
    data: &'a Dataset,
    partition: &'a Partition,
    selector: CvLassoSelector,
}

impl<'a> ArmRunner<'a> {
    pub fn new(config: &'a ExperimentConfig, data: &'a Dataset, partition: &'a Partition) -> Self {
        Self {
            config,
            data,
            partition,
            selector: CvLassoSelector::new(config.fold_count).n_lambda(config.n_lambda),
        }
    }

    /// Run one arm. Failures are reported as absences, never as errors.
    pub fn run<R: Rng + ?Sized>(&self, arm: Arm, rng: &mut R) -> ArmOutcome {
        match arm {
            Arm::Masking => self.masking(rng),
            Arm::Full => {
                let stage = Stage::whole(self.data, self.data.y.clone());
                self.evaluate(&stage, &stage, false, rng)
            }
            Arm::Split => self.split(self.partition, rng),
            Arm::MySplit => self.split(&self.partition.larger_selection(), rng),
            Arm::Loocv => {
                let partition =
                    Partition::holdout(self.data.n_rows(), self.config.holdout, rng);
                self.split(&partition, rng)
            }
        }
    }

    fn masking<R: Rng + ?Sized>(&self, rng: &mut R) -> ArmOutcome {
        let tau = self.config.tau;
        let sd = self.data.sd;
        let n = self.data.n_rows();
        let noise: Vec<f64> = (0..n)
            .map(|_| sd * rng.sample::<f64, _>(StandardNormal))
            .collect();

        let f = Col::from_fn(n, |i| self.data.y[i] + tau * noise[i]);
        let g = Col::from_fn(n, |i| self.data.y[i] - noise[i] / tau);

        let known_noise = self.config.masking_variance == MaskingVariance::KnownNoise;
        self.evaluate(
            &Stage::whole(self.data, f),
            &Stage::whole(self.data, g),
            known_noise,
            rng,
        )
    }

    fn split<R: Rng + ?Sized>(&self, partition: &Partition, rng: &mut R) -> ArmOutcome {
        let selection = Stage::rows(self.data, &partition.selection);
        let inference = Stage::rows(self.data, &partition.inference);
        self.evaluate(&selection, &inference, false, rng)
    }

    fn evaluate<R: Rng + ?Sized>(
        &self,
        selection: &Stage,
        inference: &Stage,
        known_noise: bool,
        rng: &mut R,
    ) -> ArmOutcome {
        let selected = match self.selector.select(&selection.x, &selection.y, rng) {
            Ok(selected) => selected,
            Err(err) => return ArmOutcome::Absent(AbsenceReason::from_error(err)),
        };
        if selected.is_empty() {
            return ArmOutcome::Absent(AbsenceReason::EmptySelection);
        }
        let projected = match projected_target(&self.config.beta, &self.data.sigma, &selected) {
            Ok(projected) => projected,
            Err(err) => return ArmOutcome::Absent(AbsenceReason::from_error(err)),
        };

        match self.infer(&selected, inference, known_noise) {
            Ok(intervals) => ArmOutcome::Present(ArmResult {
                selected,
                intervals,
                projected,
            }),
            Err(err) => {
                log::debug!("{} selected, no intervals: {}", selected.len(), err);
                ArmOutcome::Uninferred(Uninferred {
                    selected,
                    projected,
                    reason: AbsenceReason::from_error(err),
                })
            }
        }
    }

    fn infer(
        &self,
        selected: &[usize],
        inference: &Stage,
        known_noise: bool,
    ) -> Result<Vec<ConfidenceInterval>, RegressionError> {
        let level = self.config.confidence_level();
        let x_m = select_columns(&inference.x, selected);

        if log::log_enabled!(log::Level::Trace) {
            let leverage = compute_leverage(&x_m, true);
            let max = leverage.iter().copied().fold(f64::NAN, f64::max);
            log::trace!(
                "inference on {} rows, {} columns, max leverage {:.3}",
                x_m.nrows(),
                x_m.ncols(),
                max
            );
        }

        let fit: InferenceResult = if known_noise {
            fission_intervals(&x_m, &inference.y, self.data.sd, self.config.tau, level)?
        } else {
            ClusterRobustInference::infer(&x_m, &inference.y, &inference.clusters, level)?
        };
        Ok(selected
            .iter()
            .enumerate()
            .map(|(k, &feature)| ConfidenceInterval {
                feature,
                estimate: fit.estimates[k],
                lower: fit.lower[k],
                upper: fit.upper[k],
            })
            .collect())
    }
}
