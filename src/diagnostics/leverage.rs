//! Leverage (hat matrix) calculations.

use crate::utils::{augment_intercept, invert_matrix};
use faer::{Col, Mat};

/// Build design matrix, optionally prepending an intercept column.
fn build_design_matrix(x: &Mat<f64>, with_intercept: bool) -> Mat<f64> {
    if with_intercept {
        augment_intercept(x)
    } else {
        x.to_owned()
    }
}

/// Compute x_i' (X'X)^(-1) x_j for two rows of a design.
fn cross_leverage(design: &Mat<f64>, xtx_inv: &Mat<f64>, i: usize, j: usize) -> f64 {
    let p = design.ncols();
    let mut h = 0.0;
    for a in 0..p {
        for b in 0..p {
            h += design[(i, a)] * xtx_inv[(a, b)] * design[(j, b)];
        }
    }
    h
}

/// Compute leverage values (diagonal of hat matrix H = X(X'X)^(-1)X').
///
/// Leverage measures the influence of each observation on its own fitted value.
/// High leverage points have unusual predictor values.
///
/// # Properties
/// - h_ii ∈ [0, 1]
/// - Σ h_ii = p (number of parameters)
/// - Points with h_ii > 2p/n are considered high leverage
///
/// Returns NaN for every row when X'X is singular.
pub fn compute_leverage(x: &Mat<f64>, with_intercept: bool) -> Col<f64> {
    let n = x.nrows();
    let design = build_design_matrix(x, with_intercept);
    let xtx = design.transpose() * &design;

    match invert_matrix(&xtx, 1e-12) {
        Some(xtx_inv) => Col::from_fn(n, |i| {
            cross_leverage(&design, &xtx_inv, i, i).clamp(0.0, 1.0)
        }),
        None => Col::from_fn(n, |_| f64::NAN),
    }
}

/// Block `H_gg = X_g (X'X)^(-1) X_g'` of the hat matrix for the given rows.
///
/// `design` must already contain the intercept column if one was fitted and
/// `xtx_inv` must be the inverse cross-product of that same design.
pub fn hat_block(design: &Mat<f64>, xtx_inv: &Mat<f64>, rows: &[usize]) -> Mat<f64> {
    Mat::from_fn(rows.len(), rows.len(), |a, b| {
        cross_leverage(design, xtx_inv, rows[a], rows[b])
    })
}
