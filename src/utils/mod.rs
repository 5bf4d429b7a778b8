//! Shared matrix helpers.

mod matrix;

pub use matrix::{
    augment_intercept, center_columns, center_vector, column_abs_max, detect_constant_columns,
    invert_matrix, scale_columns, select_columns, select_entries, select_rows,
};
