//! Synthetic regression data with optional high-leverage rows.

use crate::core::{Clusters, Dataset};
use crate::utils::column_abs_max;
use faer::{Col, Mat};
use rand::Rng;
use rand_distr::StandardNormal;

/// Draw one dataset.
///
/// The first `n` rows of `x` are i.i.d. `N(0, I_p)`. Each multiplier `γ`
/// appends a row `γ · (max_i |x_i1|, …, max_i |x_ip|)` where the maxima run
/// over the `n` Gaussian rows only. The response is `xβ + ε` with
/// `ε ~ N(0, sd² I)` over every row, clusters are singletons and the
/// covariance descriptor is `sd² I_p`.
pub fn generate<R: Rng + ?Sized>(
    n: usize,
    beta: &[f64],
    multipliers: &[f64],
    sd: f64,
    rng: &mut R,
) -> Dataset {
    let p = beta.len();
    let n_true = n + multipliers.len();

    let mut x = Mat::<f64>::zeros(n_true, p);
    for i in 0..n {
        for j in 0..p {
            x[(i, j)] = rng.sample(StandardNormal);
        }
    }

    let extremes = column_abs_max(&x, n);
    for (offset, &gamma) in multipliers.iter().enumerate() {
        for j in 0..p {
            x[(n + offset, j)] = gamma * extremes[j];
        }
    }

    let noise: Vec<f64> = (0..n_true).map(|_| rng.sample(StandardNormal)).collect();
    let y = Col::from_fn(n_true, |i| {
        let mean: f64 = (0..p).map(|j| x[(i, j)] * beta[j]).sum();
        mean + sd * noise[i]
    });

    let variance = sd * sd;
    let sigma = Mat::from_fn(p, p, |a, b| if a == b { variance } else { 0.0 });

    Dataset {
        x,
        y,
        clusters: Clusters::singletons(n_true),
        sigma,
        sd,
        n_base: n,
    }
}
