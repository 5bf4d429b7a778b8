//! Matrix utility functions.

use faer::{Col, Mat};

/// Detect columns that are constant (zero variance).
pub fn detect_constant_columns(x: &Mat<f64>, tolerance: f64) -> Vec<bool> {
    let n_cols = x.ncols();
    let n_rows = x.nrows();

    if n_rows == 0 {
        return vec![true; n_cols];
    }

    let mut constant = vec![false; n_cols];

    for j in 0..n_cols {
        let first = x[(0, j)];
        let all_same = (1..n_rows).all(|i| (x[(i, j)] - first).abs() < tolerance);
        constant[j] = all_same;
    }

    constant
}

/// Center a matrix by subtracting column means.
pub fn center_columns(x: &Mat<f64>) -> (Mat<f64>, Col<f64>) {
    let n_rows = x.nrows();
    let n_cols = x.ncols();

    let mut means = Col::zeros(n_cols);
    let mut centered = Mat::zeros(n_rows, n_cols);

    for j in 0..n_cols {
        let sum: f64 = (0..n_rows).map(|i| x[(i, j)]).sum();
        means[j] = sum / n_rows as f64;

        for i in 0..n_rows {
            centered[(i, j)] = x[(i, j)] - means[j];
        }
    }

    (centered, means)
}

/// Center a vector by subtracting the mean.
pub fn center_vector(y: &Col<f64>) -> (Col<f64>, f64) {
    let n = y.nrows();
    let mean: f64 = y.iter().sum::<f64>() / n as f64;

    let centered = Col::from_fn(n, |i| y[i] - mean);

    (centered, mean)
}

/// Scale already-centered columns to unit (population) standard deviation.
///
/// Returns the scaled matrix and the scale factors. Columns with zero spread
/// keep a scale of 1 so that their coefficients stay at zero.
pub fn scale_columns(x_centered: &Mat<f64>) -> (Mat<f64>, Col<f64>) {
    let n_rows = x_centered.nrows();
    let n_cols = x_centered.ncols();

    let scales = Col::from_fn(n_cols, |j| {
        let ss: f64 = (0..n_rows).map(|i| x_centered[(i, j)].powi(2)).sum();
        let sd = (ss / n_rows as f64).sqrt();
        if sd > 1e-12 {
            sd
        } else {
            1.0
        }
    });

    let scaled = Mat::from_fn(n_rows, n_cols, |i, j| x_centered[(i, j)] / scales[j]);
    (scaled, scales)
}

/// Copy the given columns of `x`, in order.
pub fn select_columns(x: &Mat<f64>, columns: &[usize]) -> Mat<f64> {
    Mat::from_fn(x.nrows(), columns.len(), |i, k| x[(i, columns[k])])
}

/// Copy the given rows of `x`, in order.
pub fn select_rows(x: &Mat<f64>, rows: &[usize]) -> Mat<f64> {
    Mat::from_fn(rows.len(), x.ncols(), |k, j| x[(rows[k], j)])
}

/// Copy the given entries of `y`, in order.
pub fn select_entries(y: &Col<f64>, rows: &[usize]) -> Col<f64> {
    Col::from_fn(rows.len(), |k| y[rows[k]])
}

/// Prepend a column of ones: `[1 | X]`.
pub fn augment_intercept(x: &Mat<f64>) -> Mat<f64> {
    Mat::from_fn(x.nrows(), x.ncols() + 1, |i, j| {
        if j == 0 {
            1.0
        } else {
            x[(i, j - 1)]
        }
    })
}

/// Coordinatewise maximum absolute value over the first `n_rows` rows.
pub fn column_abs_max(x: &Mat<f64>, n_rows: usize) -> Col<f64> {
    let n_rows = n_rows.min(x.nrows());
    Col::from_fn(x.ncols(), |j| {
        (0..n_rows).map(|i| x[(i, j)].abs()).fold(0.0, f64::max)
    })
}

/// Invert a square matrix via QR decomposition and back-substitution.
///
/// Returns `None` when a diagonal entry of R falls below `tolerance`
/// relative to the largest one.
pub fn invert_matrix(matrix: &Mat<f64>, tolerance: f64) -> Option<Mat<f64>> {
    let n = matrix.nrows();
    if n == 0 {
        return Some(Mat::zeros(0, 0));
    }

    let qr = matrix.qr();
    let q = qr.compute_Q();
    let r = qr.R().to_owned();

    let r_max = (0..n).map(|i| r[(i, i)].abs()).fold(0.0, f64::max);
    if r_max == 0.0 || (0..n).any(|i| r[(i, i)].abs() <= tolerance * r_max) {
        return None;
    }

    // Solve R * X = Q' column by column
    let qt = q.transpose().to_owned();
    let mut inv = Mat::zeros(n, n);
    for col in 0..n {
        for i in (0..n).rev() {
            let mut sum = qt[(i, col)];
            for j in (i + 1)..n {
                sum -= r[(i, j)] * inv[(j, col)];
            }
            inv[(i, col)] = sum / r[(i, i)];
        }
    }

    Some(inv)
}
