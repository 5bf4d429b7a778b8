//! Cross-validated lasso with the one-standard-error rule.
//!
//! The penalty grid is computed once on the full sample, every fold fits the
//! whole (warm-started) path on its training rows, and the selected penalty is
//! the largest one whose mean cross-validated error is within one standard
//! error of the minimum. The model is then refit on all rows and the nonzero
//! coefficients are reported as the selected features.

use crate::core::RegressionOptions;
use crate::solvers::lasso::{LassoRegressor, ZERO_TOLERANCE};
use crate::solvers::traits::RegressionError;
use crate::utils::{select_entries, select_rows};
use faer::{Col, Mat};
use rand::seq::SliceRandom;
use rand::Rng;

/// Cross-validated lasso selector.
#[derive(Debug, Clone)]
pub struct CvLassoSelector {
    options: RegressionOptions,
    fold_count: usize,
    n_lambda: usize,
}

/// Everything the cross-validation produced.
///
/// For a constant response the path is empty, both penalties are zero and no
/// feature is selected.
#[derive(Debug, Clone)]
pub struct CvLassoFit {
    /// Penalty grid, largest first.
    pub lambdas: Vec<f64>,
    /// Mean cross-validated squared error per penalty.
    pub cv_mean: Vec<f64>,
    /// Standard error of the fold errors per penalty.
    pub cv_se: Vec<f64>,
    /// Penalty with minimum mean error.
    pub lambda_min: f64,
    /// Largest penalty within one standard error of the minimum.
    pub lambda_1se: f64,
    /// Coefficients of the full-sample refit at `lambda_1se`.
    pub coefficients: Col<f64>,
    /// Nonzero coefficient indices of the refit (intercept excluded).
    pub selected: Vec<usize>,
}

/// Log-spaced grid from `lambda_max` down to `lambda_max * min_ratio`.
pub fn lambda_grid(lambda_max: f64, n_lambda: usize, min_ratio: f64) -> Vec<f64> {
    if n_lambda <= 1 {
        return vec![lambda_max];
    }
    let log_max = lambda_max.ln();
    let step = min_ratio.ln() / (n_lambda - 1) as f64;
    (0..n_lambda)
        .map(|k| (log_max + step * k as f64).exp())
        .collect()
}

/// Apply the one-standard-error rule to a cross-validation curve ordered
/// from the largest penalty to the smallest.
///
/// Returns `(index_min, index_1se)` with `index_1se <= index_min`, or `None`
/// if no penalty has a finite mean error.
pub fn one_standard_error(cv_mean: &[f64], cv_se: &[f64]) -> Option<(usize, usize)> {
    let (index_min, &best) = cv_mean
        .iter()
        .enumerate()
        .filter(|(_, m)| m.is_finite())
        .min_by(|a, b| a.1.total_cmp(b.1))?;

    let se = if cv_se[index_min].is_finite() {
        cv_se[index_min]
    } else {
        0.0
    };
    let threshold = best + se;

    let index_1se = cv_mean
        .iter()
        .position(|&m| m.is_finite() && m <= threshold)
        .unwrap_or(index_min);

    Some((index_min, index_1se))
}

/// Balanced random fold labels in `0..fold_count`.
pub fn assign_folds<R: Rng + ?Sized>(n_rows: usize, fold_count: usize, rng: &mut R) -> Vec<usize> {
    let mut folds: Vec<usize> = (0..n_rows).map(|i| i % fold_count).collect();
    folds.shuffle(rng);
    folds
}

impl CvLassoSelector {
    /// Selector with `fold_count` folds and default lasso options.
    pub fn new(fold_count: usize) -> Self {
        Self {
            options: RegressionOptions::default(),
            fold_count,
            n_lambda: 100,
        }
    }

    /// Set the number of penalties on the grid.
    pub fn n_lambda(mut self, n_lambda: usize) -> Self {
        self.n_lambda = n_lambda;
        self
    }

    fn check_folds(&self, n_rows: usize) -> Result<(), RegressionError> {
        if self.fold_count < 2 {
            return Err(RegressionError::InvalidConfiguration(format!(
                "fold_count must be at least 2, got {}",
                self.fold_count
            )));
        }
        if self.fold_count > n_rows {
            return Err(RegressionError::InvalidConfiguration(format!(
                "fold_count = {} exceeds the {} available rows",
                self.fold_count, n_rows
            )));
        }
        let largest_fold = n_rows.div_ceil(self.fold_count);
        if n_rows - largest_fold < 2 {
            return Err(RegressionError::InvalidConfiguration(format!(
                "{} rows leave fewer than 2 training rows per fold with {} folds",
                n_rows, self.fold_count
            )));
        }
        Ok(())
    }

    /// Run the cross-validation and the full-sample refit.
    pub fn fit<R: Rng + ?Sized>(
        &self,
        x: &Mat<f64>,
        y: &Col<f64>,
        rng: &mut R,
    ) -> Result<CvLassoFit, RegressionError> {
        let n_rows = x.nrows();
        let n_features = x.ncols();

        if n_rows != y.nrows() {
            return Err(RegressionError::DimensionMismatch {
                x_rows: n_rows,
                y_len: y.nrows(),
            });
        }
        self.check_folds(n_rows)?;

        let lasso = LassoRegressor::new(self.options.clone());
        let lambda_max = lasso.lambda_max(x, y)?;

        if !lambda_max.is_finite() || lambda_max <= 1e-12 {
            return Ok(CvLassoFit {
                lambdas: Vec::new(),
                cv_mean: Vec::new(),
                cv_se: Vec::new(),
                lambda_min: 0.0,
                lambda_1se: 0.0,
                coefficients: Col::zeros(n_features),
                selected: Vec::new(),
            });
        }

        let ratio = if n_rows < n_features { 0.01 } else { 1e-4 };
        let lambdas = lambda_grid(lambda_max, self.n_lambda, ratio);

        let folds = assign_folds(n_rows, self.fold_count, rng);
        let mut fold_errors: Vec<Vec<f64>> = Vec::with_capacity(self.fold_count);
        let mut fold_sizes: Vec<f64> = Vec::with_capacity(self.fold_count);

        for fold in 0..self.fold_count {
            let (train, test): (Vec<usize>, Vec<usize>) =
                (0..n_rows).partition(|&i| folds[i] != fold);

            let x_train = select_rows(x, &train);
            let y_train = select_entries(y, &train);
            let x_test = select_rows(x, &test);
            let y_test = select_entries(y, &test);

            let path = lasso.fit_path(&x_train, &y_train, &lambdas)?;
            let errors = (0..lambdas.len())
                .map(|k| {
                    let pred = path.predict(k, &x_test);
                    (0..test.len())
                        .map(|i| (y_test[i] - pred[i]).powi(2))
                        .sum::<f64>()
                        / test.len() as f64
                })
                .collect();
            fold_errors.push(errors);
            fold_sizes.push(test.len() as f64);
        }

        let (cv_mean, cv_se) = Self::summarize_folds(&fold_errors, &fold_sizes, lambdas.len());

        let (index_min, index_1se) = one_standard_error(&cv_mean, &cv_se).ok_or_else(|| {
            RegressionError::NumericalError("cross-validation errors are all non-finite".into())
        })?;

        let full_path = lasso.fit_path(x, y, &lambdas)?;
        let coefficients = Col::from_fn(n_features, |j| full_path.coefficients[(j, index_1se)]);
        let selected = (0..n_features)
            .filter(|&j| coefficients[j].abs() > ZERO_TOLERANCE)
            .collect();

        log::trace!(
            "cv lasso: lambda_min = {:.4e}, lambda_1se = {:.4e}, selected {:?}",
            lambdas[index_min],
            lambdas[index_1se],
            selected
        );

        Ok(CvLassoFit {
            lambda_min: lambdas[index_min],
            lambda_1se: lambdas[index_1se],
            lambdas,
            cv_mean,
            cv_se,
            coefficients,
            selected,
        })
    }

    /// Selected feature indices only. An empty set is a valid outcome.
    pub fn select<R: Rng + ?Sized>(
        &self,
        x: &Mat<f64>,
        y: &Col<f64>,
        rng: &mut R,
    ) -> Result<Vec<usize>, RegressionError> {
        Ok(self.fit(x, y, rng)?.selected)
    }

    /// Fold-size weighted mean error and its standard error per penalty.
    fn summarize_folds(
        fold_errors: &[Vec<f64>],
        fold_sizes: &[f64],
        n_lambda: usize,
    ) -> (Vec<f64>, Vec<f64>) {
        let n_folds = fold_errors.len() as f64;
        let total: f64 = fold_sizes.iter().sum();

        let mut cv_mean = vec![0.0; n_lambda];
        let mut cv_se = vec![0.0; n_lambda];
        for k in 0..n_lambda {
            let mean = fold_errors
                .iter()
                .zip(fold_sizes)
                .map(|(e, &w)| w * e[k])
                .sum::<f64>()
                / total;
            let var = fold_errors
                .iter()
                .zip(fold_sizes)
                .map(|(e, &w)| w * (e[k] - mean).powi(2))
                .sum::<f64>()
                / total;
            cv_mean[k] = mean;
            cv_se[k] = (var / (n_folds - 1.0)).sqrt();
        }
        (cv_mean, cv_se)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_lambda_grid_endpoints() {
        let grid = lambda_grid(2.0, 5, 0.01);
        assert_eq!(grid.len(), 5);
        assert!((grid[0] - 2.0).abs() < 1e-12);
        assert!((grid[4] - 0.02).abs() < 1e-12);
        assert!(grid.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_one_standard_error_prefers_larger_penalty() {
        // Curve over a decreasing grid; minimum at index 4
        let cv_mean = vec![5.0, 3.0, 2.2, 2.05, 2.0, 2.1];
        let cv_se = vec![0.3, 0.3, 0.3, 0.3, 0.25, 0.3];

        let (index_min, index_1se) = one_standard_error(&cv_mean, &cv_se).expect("finite curve");
        assert_eq!(index_min, 4);
        assert_eq!(index_1se, 2);
        assert!(cv_mean[index_1se] <= cv_mean[index_min] + cv_se[index_min]);
    }

    #[test]
    fn test_one_standard_error_skips_non_finite() {
        let cv_mean = vec![f64::NAN, 1.0, 0.5];
        let cv_se = vec![f64::NAN, 0.1, 0.1];
        assert_eq!(one_standard_error(&cv_mean, &cv_se), Some((2, 2)));
        assert_eq!(one_standard_error(&[f64::NAN], &[0.0]), None);
    }

    #[test]
    fn test_assign_folds_balanced() {
        let mut rng = StdRng::seed_from_u64(7);
        let folds = assign_folds(11, 3, &mut rng);
        let counts: Vec<usize> = (0..3)
            .map(|f| folds.iter().filter(|&&g| g == f).count())
            .collect();
        assert_eq!(counts, vec![4, 4, 3]);
    }

    #[test]
    fn test_too_many_folds_is_invalid_configuration() {
        let x = Mat::from_fn(4, 3, |i, j| (i * 3 + j) as f64);
        let y = Col::from_fn(4, |i| i as f64);
        let mut rng = StdRng::seed_from_u64(1);

        let result = CvLassoSelector::new(5).select(&x, &y, &mut rng);
        assert!(matches!(result, Err(RegressionError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_constant_response_selects_nothing() {
        let x = Mat::from_fn(12, 3, |i, j| ((i * (j + 2)) % 5) as f64);
        let y = Col::from_fn(12, |_| 4.0);
        let mut rng = StdRng::seed_from_u64(1);

        let fit = CvLassoSelector::new(3).fit(&x, &y, &mut rng).expect("fit should succeed");
        assert!(fit.selected.is_empty());
        assert!(fit.lambdas.is_empty());
    }
}
