//! Regression solvers: OLS for inference, lasso for selection.

mod lasso;
mod lasso_cv;
mod ols;
mod traits;

pub use lasso::{LassoPath, LassoRegressor};
pub use lasso_cv::{assign_folds, lambda_grid, one_standard_error, CvLassoFit, CvLassoSelector};
pub use ols::{FittedOls, OlsRegressor, OlsRegressorBuilder};
pub use traits::{FittedRegressor, RegressionError, Regressor};
