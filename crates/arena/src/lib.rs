//! A single fixed-capacity buffer of units, allocated from both ends.
//!
//! The head grows upward and holds permanent factor data; the tail grows downward and holds
//! transient work data. Allocation failure at either end is soft (`None`): the owner is expected
//! to compact its live head blocks or [`Arena::grow`] the buffer and try again.

mod arena;
mod realloc;
mod unit;

pub use arena::Arena;
pub use realloc::{realloc, Reallocator, SystemReallocator};
pub use unit::{units_of, Offset, Unit};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The byte size of the request is not representable; the primitive was never called.
    #[error("Requesting {n_objects} objects of {size_of_object} bytes overflows the addressable size")]
    SizeOverflow {
        n_objects: usize,
        size_of_object: usize,
    },

    /// The system could not provide the memory. The buffer keeps its previous size.
    #[error("Out of memory while resizing the arena to {bytes} bytes")]
    OutOfMemory { bytes: usize },

    #[error("The arena tail still holds {units} units of work data")]
    TailInUse { units: usize },
}
