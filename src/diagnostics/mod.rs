//! Regression diagnostics.
//!
//! - **Leverage**: hat-matrix diagonals and per-cluster hat blocks, used by
//!   the CR2 sandwich and to report how influential the appended rows are.

mod leverage;

pub use leverage::{compute_leverage, hat_block};
