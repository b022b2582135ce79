//! Storage and use of the numeric factors `P R A Q = L U` of a sparse matrix.
//!
//! All column/row data of `L` and `U` lives in one [`lu_arena::Arena`]. Consecutive pivots that
//! share most of their pattern form *chains*: each column (row) of a chain only stores the indices
//! it adds to the previous one, and the solves rebuild the full pattern on the fly in a
//! [`PatternSet`].

pub(crate) mod constants;
mod builder;
mod column;
mod compact;
mod io;
mod lsolve;
mod numeric;
mod pattern;
mod solve;
mod store;
mod usolve;
mod walk;

pub use builder::{BuilderConfig, LLink, NumericBuilder, ULink};
pub use column::{LColumn, URow};
pub use constants::{DIV_FLOPS, MULTSUB_FLOPS};
pub use numeric::{Numeric, Scaling};
pub use pattern::PatternSet;
pub use solve::SolveInfo;
pub use store::FactorStore;

use nalgebra::RealField;
use thiserror::Error;

/// Scalars that can be stored in the arena.
pub trait Entry: RealField + Copy + bytemuck::Pod {}

impl<T> Entry for T where T: RealField + Copy + bytemuck::Pod {}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Arena(#[from] lu_arena::Error),

    /// The factors fail the structural validity check.
    #[error("Invalid numeric object: {reason}")]
    InvalidNumeric { reason: String },

    /// A column or row handed to the builder contradicts the factors built so far.
    #[error("Malformed factor data at pivot {k}: {reason}")]
    MalformedColumn { k: usize, reason: String },

    #[error("The matrix must be square to be solved ({n_row} x {n_col})")]
    NotSquare { n_row: usize, n_col: usize },

    #[error("Expected a vector of length {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("File I/O error")]
    Io(#[from] std::io::Error),

    #[error("Not a saved numeric object: {reason}")]
    BadFormat { reason: String },
}
