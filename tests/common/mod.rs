//! Common test utilities and data generators.
#![allow(dead_code)]

use faer::{Col, Mat};
use fission_rs::core::ExperimentConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

/// Generate sparse linear data: y = intercept + x * beta + noise.
///
/// Features and noise are standard normal draws from a seeded `StdRng`.
pub fn generate_sparse_data(
    n_samples: usize,
    beta: &[f64],
    intercept: f64,
    noise_std: f64,
    seed: u64,
) -> (Mat<f64>, Col<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let p = beta.len();

    let mut x = Mat::zeros(n_samples, p);
    let mut y = Col::zeros(n_samples);
    for i in 0..n_samples {
        let mut yi = intercept;
        for j in 0..p {
            let v: f64 = StandardNormal.sample(&mut rng);
            x[(i, j)] = v;
            yi += v * beta[j];
        }
        let e: f64 = StandardNormal.sample(&mut rng);
        y[i] = yi + noise_std * e;
    }

    (x, y)
}

/// Generate data with collinear features.
pub fn generate_collinear_data(n_samples: usize) -> (Mat<f64>, Col<f64>) {
    let mut x = Mat::zeros(n_samples, 3);
    let mut y = Col::zeros(n_samples);

    for i in 0..n_samples {
        x[(i, 0)] = i as f64;
        x[(i, 1)] = 2.0 * i as f64; // Perfectly collinear with x0
        x[(i, 2)] = (i * i) as f64;
        y[i] = 1.0 + 2.0 * x[(i, 0)] + 3.0 * x[(i, 2)];
    }

    (x, y)
}

/// Calibration setup (n = 15, p = 20, four true signals) with a custom run
/// count and scenario list.
pub fn calibration_config(runs: usize, scenarios: Vec<Vec<f64>>, seed: u64) -> ExperimentConfig {
    ExperimentConfig::builder()
        .runs(runs)
        .scenarios(scenarios)
        .seed(seed)
        .build()
        .expect("calibration config is valid")
}

/// Approximate equality check that treats two NaNs as equal.
pub fn same_or_both_nan(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a == b
}
