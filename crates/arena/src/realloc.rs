//! Resizing of the arena's backing buffer.

use log::trace;

use crate::Error;

/// The byte-level primitive that actually changes the size of a buffer.
///
/// Implementations must be atomic: on `Err` the buffer keeps its previous length and contents.
pub trait Reallocator {
    /// Resize `buffer` to exactly `len` objects. New slots are filled with `X::default()`.
    fn resize<X: Copy + Default>(&mut self, buffer: &mut Vec<X>, len: usize) -> Result<(), Error>;
}

/// Reallocates through the global allocator, reporting failure instead of aborting.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemReallocator;

impl Reallocator for SystemReallocator {
    fn resize<X: Copy + Default>(&mut self, buffer: &mut Vec<X>, len: usize) -> Result<(), Error> {
        if len > buffer.len() {
            buffer
                .try_reserve_exact(len - buffer.len())
                .map_err(|_| Error::OutOfMemory {
                    bytes: len * std::mem::size_of::<X>(),
                })?;
            buffer.resize(len, X::default());
        } else {
            buffer.truncate(len);
            buffer.shrink_to_fit();
        }
        Ok(())
    }
}

/// Resize `buffer` to hold `n_objects` objects.
///
/// At least one object is always requested. If the total byte size would not be representable as
/// an `isize`, the call fails with [`Error::SizeOverflow`] before `reallocator` is consulted.
/// Any failure leaves `buffer` exactly as it was.
pub fn realloc<X, R>(reallocator: &mut R, buffer: &mut Vec<X>, n_objects: usize) -> Result<(), Error>
where
    X: Copy + Default,
    R: Reallocator,
{
    // make sure that we allocate something
    let n_objects = n_objects.max(1);
    let size_of_object = std::mem::size_of::<X>();

    n_objects
        .checked_mul(size_of_object)
        .filter(|&bytes| bytes <= isize::MAX as usize)
        .ok_or(Error::SizeOverflow {
            n_objects,
            size_of_object,
        })?;

    trace!(
        "realloc: {} -> {} objects of {} bytes",
        buffer.len(),
        n_objects,
        size_of_object
    );
    reallocator.resize(buffer, n_objects)
}
