//! Projected targets for selected models.

use crate::solvers::RegressionError;
use crate::utils::invert_matrix;
use faer::Mat;

/// Population projection of β onto the selected features.
///
/// β*_M = β_M + Σ_MM⁻¹ Σ_{M,Mᶜ} β_{Mᶜ}
///
/// `sigma` is the `p × p` covariance descriptor of the design. Returns one
/// value per entry of `selected`, in the same order.
pub fn projected_target(
    beta: &[f64],
    sigma: &Mat<f64>,
    selected: &[usize],
) -> Result<Vec<f64>, RegressionError> {
    let p = beta.len();
    if sigma.nrows() != p || sigma.ncols() != p {
        return Err(RegressionError::DimensionMismatch {
            x_rows: sigma.nrows(),
            y_len: p,
        });
    }
    if selected.is_empty() {
        return Ok(Vec::new());
    }

    let complement: Vec<usize> = (0..p).filter(|j| !selected.contains(j)).collect();
    let k = selected.len();

    let sigma_mm = Mat::from_fn(k, k, |a, b| sigma[(selected[a], selected[b])]);
    let sigma_mm_inv = invert_matrix(&sigma_mm, 1e-12).ok_or(RegressionError::SingularMatrix)?;

    // Σ_{M,Mᶜ} β_{Mᶜ}
    let leak: Vec<f64> = selected
        .iter()
        .map(|&m| complement.iter().map(|&c| sigma[(m, c)] * beta[c]).sum())
        .collect();

    Ok((0..k)
        .map(|a| {
            let correction: f64 = (0..k).map(|b| sigma_mm_inv[(a, b)] * leak[b]).sum();
            beta[selected[a]] + correction
        })
        .collect())
}
