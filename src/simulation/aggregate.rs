//! Reduction of trial records into per-scenario, per-arm metrics.

use crate::simulation::arms::{AbsenceReason, Arm, ArmOutcome};
use crate::simulation::runner::TrialRecord;
use serde::{Deserialize, Serialize};

/// Metrics for one arm in one leverage scenario.
///
/// Rates that have no defined value (for example precision when the arm never
/// produced intervals) are `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmSummary {
    pub scenario: usize,
    pub multipliers: Vec<f64>,
    pub arm: Arm,
    /// Mean of `|M ∩ S| / |S|` over all trials; absent trials count as 0.
    pub power: f64,
    /// Mean of `|M ∩ S| / |M|` over trials with a non-empty selection,
    /// intervals or not.
    pub precision: f64,
    /// Mean share of intervals missing β*(M) over trials with intervals.
    pub false_coverage_rate: f64,
    /// Mean interval length pooled over every interval produced.
    pub mean_ci_length: f64,
    pub trials: usize,
    pub present: usize,
    /// Trials that selected features but could not build intervals.
    pub uninferred: usize,
    pub empty_selection: usize,
    pub failures: usize,
}

#[derive(Default)]
struct Accumulator {
    trials: usize,
    present: usize,
    uninferred: usize,
    empty_selection: usize,
    failures: usize,
    power: f64,
    precision: f64,
    false_coverage: f64,
    ci_length: f64,
    n_intervals: usize,
}

impl Accumulator {
    fn push(&mut self, outcome: &ArmOutcome, support: &[usize]) {
        self.trials += 1;
        match outcome {
            ArmOutcome::Present(result) => {
                self.present += 1;
                self.push_selection(&result.selected, support);
                self.false_coverage +=
                    result.non_covering() as f64 / result.selected.len().max(1) as f64;
                for ci in &result.intervals {
                    self.ci_length += ci.length();
                    self.n_intervals += 1;
                }
            }
            ArmOutcome::Uninferred(partial) => {
                self.uninferred += 1;
                self.push_selection(&partial.selected, support);
            }
            ArmOutcome::Absent(AbsenceReason::EmptySelection) => self.empty_selection += 1,
            ArmOutcome::Absent(_) => self.failures += 1,
        }
    }

    fn push_selection(&mut self, selected: &[usize], support: &[usize]) {
        let hits = selected.iter().filter(|j| support.contains(j)).count() as f64;
        if !support.is_empty() {
            self.power += hits / support.len() as f64;
        }
        self.precision += hits / selected.len().max(1) as f64;
    }

    fn finish(
        self,
        scenario: usize,
        multipliers: Vec<f64>,
        arm: Arm,
        support: &[usize],
    ) -> ArmSummary {
        let ratio = |sum: f64, count: usize| {
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        };
        let power = if support.is_empty() {
            f64::NAN
        } else {
            ratio(self.power, self.trials)
        };

        ArmSummary {
            scenario,
            multipliers,
            arm,
            power,
            precision: ratio(self.precision, self.present + self.uninferred),
            false_coverage_rate: ratio(self.false_coverage, self.present),
            mean_ci_length: ratio(self.ci_length, self.n_intervals),
            trials: self.trials,
            present: self.present,
            uninferred: self.uninferred,
            empty_selection: self.empty_selection,
            failures: self.failures,
        }
    }
}

/// Fold trial records into one summary per `(scenario, arm)`.
///
/// The input order does not matter: records are sorted by
/// `(scenario, trial)` first, so the floating point sums are reproducible.
/// Output is ordered by scenario, then by [`Arm::ALL`].
pub fn summarize(trials: &[TrialRecord], true_support: &[usize]) -> Vec<ArmSummary> {
    let mut records: Vec<&TrialRecord> = trials.iter().collect();
    records.sort_by_key(|r| (r.scenario, r.trial));

    let mut summaries = Vec::new();
    let mut start = 0;
    while start < records.len() {
        let scenario = records[start].scenario;
        let end = records[start..]
            .iter()
            .position(|r| r.scenario != scenario)
            .map_or(records.len(), |offset| start + offset);
        let group = &records[start..end];

        for arm in Arm::ALL {
            let mut acc = Accumulator::default();
            for record in group {
                if let Some(outcome) = record.outcome(arm) {
                    acc.push(outcome, true_support);
                }
            }
            summaries.push(acc.finish(
                scenario,
                group[0].multipliers.clone(),
                arm,
                true_support,
            ));
        }
        start = end;
    }
    summaries
}
