//! Helpers around a sparse LU factorization that do not touch the factors themselves.

mod order;
mod triplet;

pub use order::apply_order;
pub use triplet::{triplet_to_col, CompressedCol};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Matrix dimensions must be positive ({n_row} x {n_col})")]
    NonPositiveDimension { n_row: usize, n_col: usize },

    /// An input array is absent or does not have the length of the others.
    #[error("Argument missing or mismatched: {what}")]
    ArgumentMissing { what: &'static str },

    #[error("Invalid matrix: {reason}")]
    InvalidMatrix { reason: String },
}
