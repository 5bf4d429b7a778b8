//! Aggregation of trial records into arm summaries.

use approx::assert_relative_eq;
use fission_rs::inference::ConfidenceInterval;
use fission_rs::simulation::{
    summarize, AbsenceReason, Arm, ArmOutcome, ArmResult, TrialRecord, Uninferred,
};

fn interval(feature: usize, lower: f64, upper: f64) -> ConfidenceInterval {
    ConfidenceInterval {
        feature,
        estimate: (lower + upper) / 2.0,
        lower,
        upper,
    }
}

fn record(scenario: usize, trial: usize, outcome: ArmOutcome) -> TrialRecord {
    TrialRecord {
        scenario,
        multipliers: vec![scenario as f64 * 2.0],
        trial,
        outcomes: Arm::ALL.iter().map(|&arm| (arm, outcome.clone())).collect(),
    }
}

#[test]
fn test_empty_selection_enters_only_power_denominator() {
    let hit = ArmOutcome::Present(ArmResult {
        selected: vec![0],
        intervals: vec![interval(0, 0.0, 2.0)],
        projected: vec![1.0],
    });
    let records = vec![
        record(0, 0, hit.clone()),
        record(0, 1, ArmOutcome::Absent(AbsenceReason::EmptySelection)),
    ];
    let s = &summarize(&records, &[0, 1])[0];

    // power: (1/2 + 0) / 2
    assert_relative_eq!(s.power, 0.25, epsilon = 1e-12);
    assert_relative_eq!(s.precision, 1.0, epsilon = 1e-12);
    assert_relative_eq!(s.false_coverage_rate, 0.0, epsilon = 1e-12);
    assert_relative_eq!(s.mean_ci_length, 2.0, epsilon = 1e-12);
    assert_eq!(s.empty_selection, 1);
    assert_eq!(s.failures, 0);
}

#[test]
fn test_selection_without_intervals_scores_power_not_coverage() {
    let covered = ArmOutcome::Present(ArmResult {
        selected: vec![0, 3],
        intervals: vec![interval(0, 0.0, 2.0), interval(3, -1.0, 1.0)],
        projected: vec![1.0, 0.0],
    });
    let uninferred = ArmOutcome::Uninferred(Uninferred {
        selected: vec![0, 1],
        projected: vec![1.0, 1.0],
        reason: AbsenceReason::NumericalFailure("insufficient observations".into()),
    });
    let records = vec![record(0, 0, covered), record(0, 1, uninferred)];
    let s = &summarize(&records, &[0, 1])[0];

    // power: (1/2 + 2/2) / 2, precision: (1/2 + 2/2) / 2
    assert_relative_eq!(s.power, 0.75, epsilon = 1e-12);
    assert_relative_eq!(s.precision, 0.75, epsilon = 1e-12);
    // only the trial with intervals enters FCR and CI length
    assert_relative_eq!(s.false_coverage_rate, 0.0, epsilon = 1e-12);
    assert_relative_eq!(s.mean_ci_length, 2.0, epsilon = 1e-12);
    assert_eq!((s.present, s.uninferred, s.failures), (1, 1, 0));
}

#[test]
fn test_ci_length_pools_coefficients() {
    let wide = ArmOutcome::Present(ArmResult {
        selected: vec![0, 1, 2],
        intervals: vec![
            interval(0, 0.0, 1.0),
            interval(1, 0.0, 1.0),
            interval(2, 0.0, 4.0),
        ],
        projected: vec![0.5, 0.5, 0.5],
    });
    let narrow = ArmOutcome::Present(ArmResult {
        selected: vec![0],
        intervals: vec![interval(0, 0.0, 2.0)],
        projected: vec![0.5],
    });
    let failed = ArmOutcome::Absent(AbsenceReason::NumericalFailure("singular".into()));
    let records = vec![
        record(0, 0, wide),
        record(0, 1, narrow),
        record(0, 2, failed),
    ];
    let s = &summarize(&records, &[0])[0];

    // (1 + 1 + 4 + 2) / 4, the failed trial contributes nothing
    assert_relative_eq!(s.mean_ci_length, 2.0, epsilon = 1e-12);
    assert_eq!(s.failures, 1);
}

#[test]
fn test_false_coverage_rate_stays_in_unit_interval() {
    let miss_all = ArmOutcome::Present(ArmResult {
        selected: vec![3, 4],
        intervals: vec![interval(3, 0.0, 1.0), interval(4, 0.0, 1.0)],
        projected: vec![5.0, -5.0],
    });
    let records = vec![record(0, 0, miss_all)];
    let s = &summarize(&records, &[0])[0];

    assert_relative_eq!(s.false_coverage_rate, 1.0, epsilon = 1e-12);
    assert_relative_eq!(s.precision, 0.0, epsilon = 1e-12);
    assert_relative_eq!(s.power, 0.0, epsilon = 1e-12);
}

#[test]
fn test_scenarios_are_kept_apart() {
    let records = vec![
        record(1, 0, ArmOutcome::Absent(AbsenceReason::EmptySelection)),
        record(0, 0, ArmOutcome::Absent(AbsenceReason::TrialFailed("panic".into()))),
    ];
    let summaries = summarize(&records, &[0]);

    assert_eq!(summaries.len(), 10);
    assert_eq!(summaries[0].scenario, 0);
    assert_eq!(summaries[0].failures, 1);
    assert_eq!(summaries[5].scenario, 1);
    assert_eq!(summaries[5].multipliers, vec![2.0]);
    assert_eq!(summaries[5].empty_selection, 1);
    assert!(summaries[5].precision.is_nan());
}
