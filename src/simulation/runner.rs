//! Monte Carlo driver: one dataset per trial, every arm per dataset.

use crate::core::ExperimentConfig;
use crate::simulation::arms::{AbsenceReason, Arm, ArmOutcome, ArmRunner, Partition};
use crate::simulation::generator::generate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Everything one trial produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Index into `ExperimentConfig::scenarios`.
    pub scenario: usize,
    /// Leverage multipliers of the scenario.
    pub multipliers: Vec<f64>,
    /// Trial number within the scenario.
    pub trial: usize,
    /// One outcome per arm, in [`Arm::ALL`] order.
    pub outcomes: Vec<(Arm, ArmOutcome)>,
}

impl TrialRecord {
    /// Outcome of `arm`, if recorded.
    pub fn outcome(&self, arm: Arm) -> Option<&ArmOutcome> {
        self.outcomes
            .iter()
            .find(|(a, _)| *a == arm)
            .map(|(_, outcome)| outcome)
    }

    fn failed(scenario: usize, multipliers: &[f64], trial: usize, message: String) -> Self {
        Self {
            scenario,
            multipliers: multipliers.to_vec(),
            trial,
            outcomes: Arm::ALL
                .iter()
                .map(|&arm| {
                    (
                        arm,
                        ArmOutcome::Absent(AbsenceReason::TrialFailed(message.clone())),
                    )
                })
                .collect(),
        }
    }
}

/// Generate one dataset and run all five arms on it.
///
/// `split` and `mysplit` share one coin-flip partition drawn after the data.
pub fn run_trial<R: Rng + ?Sized>(
    config: &ExperimentConfig,
    scenario: usize,
    multipliers: &[f64],
    trial: usize,
    rng: &mut R,
) -> TrialRecord {
    let data = generate(config.n, &config.beta, multipliers, config.sd(), rng);
    let partition = Partition::coin_flip(data.n_rows(), rng);
    let runner = ArmRunner::new(config, &data, &partition);

    let outcomes = Arm::ALL
        .iter()
        .map(|&arm| (arm, runner.run(arm, rng)))
        .collect();

    TrialRecord {
        scenario,
        multipliers: multipliers.to_vec(),
        trial,
        outcomes,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "trial panicked".to_string()
    }
}

/// Run `config.runs` trials for every scenario.
///
/// Per-trial seeds are drawn up front from `StdRng::seed_from_u64(config.seed)`,
/// scenario by scenario, so results do not depend on the thread count.
/// Records come back ordered by `(scenario, trial)`.
pub fn run_experiment(config: &ExperimentConfig) -> Vec<TrialRecord> {
    let mut master = StdRng::seed_from_u64(config.seed);
    let jobs: Vec<(usize, usize, u64)> = (0..config.scenarios.len())
        .flat_map(|scenario| (0..config.runs).map(move |trial| (scenario, trial)))
        .map(|(scenario, trial)| (scenario, trial, master.gen::<u64>()))
        .collect();

    log::info!(
        "running {} trials over {} scenarios on {} threads",
        jobs.len(),
        config.scenarios.len(),
        rayon::current_num_threads()
    );

    jobs.into_par_iter()
        .map(|(scenario, trial, seed)| {
            let multipliers = &config.scenarios[scenario];
            let result = catch_unwind(AssertUnwindSafe(|| {
                let mut rng = StdRng::seed_from_u64(seed);
                run_trial(config, scenario, multipliers, trial, &mut rng)
            }));
            match result {
                Ok(record) => record,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    log::warn!("scenario {scenario} trial {trial} failed: {message}");
                    TrialRecord::failed(scenario, multipliers, trial, message)
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trial_has_every_arm_in_order() {
        let config = ExperimentConfig::default();
        let mut rng = StdRng::seed_from_u64(9);
        let record = run_trial(&config, 1, &[2.0], 0, &mut rng);

        let arms: Vec<Arm> = record.outcomes.iter().map(|(a, _)| *a).collect();
        assert_eq!(arms, Arm::ALL.to_vec());
        assert_eq!(record.multipliers, vec![2.0]);
        assert!(record.outcome(Arm::Loocv).is_some());
    }

    #[test]
    fn test_failed_record_marks_every_arm() {
        let record = TrialRecord::failed(0, &[], 3, "boom".into());
        for (_, outcome) in &record.outcomes {
            assert_eq!(
                outcome,
                &ArmOutcome::Absent(AbsenceReason::TrialFailed("boom".into()))
            );
        }
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload = catch_unwind(|| {
            panic!("bad {}", 1);
        })
        .expect_err("should panic");
        assert_eq!(panic_message(payload.as_ref()), "bad 1");
    }

    #[test]
    fn test_experiment_is_ordered_and_complete() {
        let config = ExperimentConfig::builder()
            .runs(3)
            .scenarios(vec![vec![], vec![4.0]])
            .build()
            .expect("valid config");
        let records = run_experiment(&config);

        let keys: Vec<(usize, usize)> = records.iter().map(|r| (r.scenario, r.trial)).collect();
        assert_eq!(keys, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
    }
}
