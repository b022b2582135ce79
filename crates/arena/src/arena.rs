//! The dual-ended unit arena.
//!
//! One contiguous buffer of [`Unit`]s holds all factor data of a factorization. Permanent data is
//! bump-allocated upward from the head, transient work data downward from the tail:
//!
//! ```text
//!  0                head               tail               size
//!  |==== permanent ===|------ free ------|=== transient ===|
//! ```
//!
//! The arena knows nothing about what is stored in it; compaction of the head is driven by the
//! owner, which knows which blocks are live (see `relocate` and `reset_head`).

use bytemuck::Pod;
use log::trace;

use crate::{realloc, units_of, Error, Offset, Reallocator, Unit};

#[derive(Clone, Debug, PartialEq)]
pub struct Arena {
    memory: Vec<Unit>,
    /// next free unit at the head
    ihead: usize,
    /// first used unit of the tail
    itail: usize,
    /// units currently held by the tail
    tail_usage: usize,
    /// high-water mark of head + tail usage
    max_usage: usize,
}

impl Arena {
    /// Creates a zero-filled arena of `size` units with empty head and tail regions.
    pub fn new(size: usize) -> Self {
        Arena {
            memory: vec![0; size],
            ihead: 0,
            itail: size,
            tail_usage: 0,
            max_usage: 0,
        }
    }

    /// Reassembles an arena from a raw buffer and its cursors, e.g. after reading it from disk.
    ///
    /// Returns `None` unless `head <= tail <= memory.len()`.
    pub fn from_parts(memory: Vec<Unit>, head: usize, tail: usize, max_usage: usize) -> Option<Self> {
        if head > tail || tail > memory.len() {
            return None;
        }
        let tail_usage = memory.len() - tail;
        Some(Arena {
            memory,
            ihead: head,
            itail: tail,
            tail_usage,
            max_usage: max_usage.max(head + tail_usage),
        })
    }

    /// Total capacity in units.
    pub fn size(&self) -> usize {
        self.memory.len()
    }

    /// Next free offset of the head region; equal to the number of units handed out from the head.
    pub fn head(&self) -> usize {
        self.ihead
    }

    pub fn tail(&self) -> usize {
        self.itail
    }

    /// Units in the free gap `[head, tail)`.
    pub fn free(&self) -> usize {
        self.itail - self.ihead
    }

    pub fn tail_usage(&self) -> usize {
        self.tail_usage
    }

    /// Largest combined head + tail usage seen so far. Diagnostic only.
    pub fn max_usage(&self) -> usize {
        self.max_usage
    }

    /// The whole backing buffer.
    pub fn units(&self) -> &[Unit] {
        &self.memory
    }

    /// Allocates `nunits` contiguous units from the head.
    ///
    /// Returns `None` if the free gap is too small, in which case nothing about the arena changes.
    /// The owner may then compact its live data and retry, or grow the arena.
    pub fn allocate_head(&mut self, nunits: usize) -> Option<Offset> {
        if nunits > self.free() {
            trace!("allocate_head: {} units failed ({} free)", nunits, self.free());
            return None;
        }
        let p = Offset::new(self.ihead);
        self.ihead += nunits;
        self.note_usage();
        trace!("allocate_head: {} units at {}", nunits, p);
        Some(p)
    }

    /// Allocates `nunits` contiguous units from the tail. Fails exactly like [`Self::allocate_head`].
    pub fn allocate_tail(&mut self, nunits: usize) -> Option<Offset> {
        if nunits > self.free() {
            trace!("allocate_tail: {} units failed ({} free)", nunits, self.free());
            return None;
        }
        self.itail -= nunits;
        self.tail_usage += nunits;
        self.note_usage();
        trace!("allocate_tail: {} units at @{}", nunits, self.itail);
        Some(Offset::new(self.itail))
    }

    /// Drops all transient data held by the tail.
    pub fn release_tail(&mut self) {
        self.itail = self.memory.len();
        self.tail_usage = 0;
    }

    fn note_usage(&mut self) {
        self.max_usage = self.max_usage.max(self.ihead + self.tail_usage);
    }

    /// Grows the buffer to `new_size` units, moving the tail block up to the new end.
    ///
    /// Returns the number of units every tail offset moved by. Requests that would not enlarge the
    /// arena are a no-op. On error the arena is unchanged.
    pub fn grow<R: Reallocator>(&mut self, reallocator: &mut R, new_size: usize) -> Result<usize, Error> {
        let old_size = self.memory.len();
        if new_size <= old_size {
            return Ok(0);
        }
        realloc(reallocator, &mut self.memory, new_size)?;
        let shift = self.memory.len() - old_size;
        self.memory.copy_within(self.itail..old_size, self.itail + shift);
        self.itail += shift;
        trace!("grow: {} -> {} units, tail moved by {}", old_size, self.memory.len(), shift);
        Ok(shift)
    }

    /// Trims the buffer to the head once no transient data remains.
    pub fn shrink_to_head<R: Reallocator>(&mut self, reallocator: &mut R) -> Result<(), Error> {
        if self.tail_usage > 0 {
            return Err(Error::TailInUse {
                units: self.tail_usage,
            });
        }
        realloc(reallocator, &mut self.memory, self.ihead)?;
        self.itail = self.memory.len();
        Ok(())
    }

    /// A typed view of `len` objects stored at `at`.
    ///
    /// # Panics
    /// If the view does not lie inside the buffer.
    pub fn slice<X: Pod>(&self, at: Offset, len: usize) -> &[X] {
        let range = self.range::<X>(at, len);
        &bytemuck::cast_slice(&self.memory[range])[..len]
    }

    /// A mutable typed view of `len` objects stored at `at`.
    ///
    /// # Panics
    /// If the view does not lie inside the buffer.
    pub fn slice_mut<X: Pod>(&mut self, at: Offset, len: usize) -> &mut [X] {
        let range = self.range::<X>(at, len);
        &mut bytemuck::cast_slice_mut(&mut self.memory[range])[..len]
    }

    /// Copies `data` into the arena at `at`.
    pub fn write<X: Pod>(&mut self, at: Offset, data: &[X]) {
        self.slice_mut(at, data.len()).copy_from_slice(data);
    }

    fn range<X: Pod>(&self, at: Offset, len: usize) -> std::ops::Range<usize> {
        let start = at.get();
        let end = start + units_of::<X>(len);
        debug_assert!(
            end <= self.ihead || start >= self.itail,
            "view {}..{} overlaps the free region {}..{}",
            start,
            end,
            self.ihead,
            self.itail
        );
        start..end
    }

    /// Moves `nunits` units from `from` to `to`. The ranges may overlap.
    pub fn relocate(&mut self, from: Offset, to: Offset, nunits: usize) {
        if from != to {
            self.memory
                .copy_within(from.get()..from.get() + nunits, to.get());
        }
    }

    /// Sets the head cursor after the owner has compacted its live blocks below `new_head`.
    ///
    /// # Panics
    /// If `new_head` would cross into the tail.
    pub fn reset_head(&mut self, new_head: usize) {
        assert!(new_head <= self.itail, "head {} beyond tail {}", new_head, self.itail);
        self.ihead = new_head;
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::SystemReallocator;

    struct Refuse;

    impl Reallocator for Refuse {
        fn resize<X: Copy + Default>(&mut self, _: &mut Vec<X>, len: usize) -> Result<(), Error> {
            Err(Error::OutOfMemory {
                bytes: len * std::mem::size_of::<X>(),
            })
        }
    }

    #[test]
    fn test_allocate_head() {
        let mut arena = Arena::new(10);
        assert_eq!(arena.allocate_head(4), Some(Offset::new(0)));
        assert_eq!(arena.allocate_head(6), Some(Offset::new(4)));
        assert_eq!(arena.head(), 10);
        assert_eq!(arena.free(), 0);
        // empty requests still succeed when the arena is full
        assert_eq!(arena.allocate_head(0), Some(Offset::new(10)));
        assert_eq!(arena.allocate_head(1), None);
    }

    #[test]
    fn test_failure_is_side_effect_free() {
        let mut arena = Arena::new(8);
        arena.allocate_head(3).unwrap();
        arena.allocate_tail(2).unwrap();
        let before = arena.clone();
        assert_eq!(arena.allocate_head(4), None);
        assert_eq!(arena.allocate_tail(4), None);
        assert_eq!(arena, before);
        assert_eq!(arena.max_usage(), 5);
    }

    #[test]
    fn test_tail() {
        let mut arena = Arena::new(10);
        assert_eq!(arena.allocate_tail(3), Some(Offset::new(7)));
        assert_eq!(arena.allocate_head(5), Some(Offset::new(0)));
        assert_eq!(arena.tail_usage(), 3);
        assert_eq!(arena.max_usage(), 8);
        assert_eq!(arena.allocate_tail(3), None);
        arena.release_tail();
        assert_eq!(arena.tail(), 10);
        assert_eq!(arena.tail_usage(), 0);
        // the high-water mark survives the release
        assert_eq!(arena.max_usage(), 8);
    }

    #[test]
    fn test_typed_views() {
        let mut arena = Arena::new(8);
        let p = arena.allocate_head(units_of::<usize>(2) + units_of::<f64>(2)).unwrap();
        arena.write(p, &[4usize, 9]);
        let q = p.add(units_of::<usize>(2));
        arena.write(q, &[0.5f64, -2.0]);
        assert_eq!(arena.slice::<usize>(p, 2), &[4, 9]);
        assert_eq!(arena.slice::<f64>(q, 2), &[0.5, -2.0]);
        arena.slice_mut::<f64>(q, 2)[1] = 3.0;
        assert_eq!(arena.slice::<f64>(q, 2), &[0.5, 3.0]);
    }

    #[test]
    fn test_grow_moves_tail() {
        let mut arena = Arena::new(6);
        let h = arena.allocate_head(2).unwrap();
        arena.write(h, &[1u64, 2]);
        let t = arena.allocate_tail(2).unwrap();
        arena.write(t, &[7u64, 8]);

        let shift = arena.grow(&mut SystemReallocator, 10).unwrap();
        assert_eq!(shift, 4);
        assert_eq!(arena.size(), 10);
        assert_eq!(arena.tail(), 8);
        assert_eq!(arena.slice::<u64>(h, 2), &[1, 2]);
        assert_eq!(arena.slice::<u64>(t.add(shift), 2), &[7, 8]);
        assert_eq!(arena.free(), 6);

        // not a growth
        assert_eq!(arena.grow(&mut SystemReallocator, 4).unwrap(), 0);
        assert_eq!(arena.size(), 10);
    }

    #[test]
    fn test_grow_failure() {
        let mut arena = Arena::new(4);
        let h = arena.allocate_head(2).unwrap();
        arena.write(h, &[3u64, 5]);
        let before = arena.clone();
        assert!(arena.grow(&mut Refuse, 64).is_err());
        assert_eq!(arena, before);
    }

    #[test]
    fn test_shrink_to_head() {
        let mut arena = Arena::new(16);
        arena.allocate_head(5).unwrap();
        arena.allocate_tail(1).unwrap();
        assert!(matches!(
            arena.shrink_to_head(&mut SystemReallocator),
            Err(Error::TailInUse { units: 1 })
        ));
        arena.release_tail();
        arena.shrink_to_head(&mut SystemReallocator).unwrap();
        assert_eq!(arena.size(), 5);
        assert_eq!(arena.free(), 0);
    }

    #[test]
    fn test_relocate() {
        let mut arena = Arena::new(6);
        let p = arena.allocate_head(6).unwrap();
        arena.write(p, &[0u64, 0, 1, 2, 3, 4]);
        arena.relocate(Offset::new(2), Offset::new(0), 4);
        assert_eq!(arena.slice::<u64>(p, 4), &[1, 2, 3, 4]);
        arena.reset_head(4);
        assert_eq!(arena.free(), 2);
    }

    #[test]
    fn test_from_parts() {
        assert!(Arena::from_parts(vec![0; 4], 3, 2, 0).is_none());
        assert!(Arena::from_parts(vec![0; 4], 1, 5, 0).is_none());
        let arena = Arena::from_parts(vec![0; 4], 2, 3, 0).unwrap();
        assert_eq!(arena.tail_usage(), 1);
        assert_eq!(arena.max_usage(), 3);
    }

    proptest! {
        #[test]
        fn head_offsets_are_monotone(requests in prop::collection::vec(0usize..16, 0..40)) {
            let mut arena = Arena::new(128);
            let mut expected_head = 0;
            let mut last_end = 0;
            for n in requests {
                match arena.allocate_head(n) {
                    Some(p) => {
                        prop_assert!(p.get() >= last_end);
                        last_end = p.get() + n;
                        expected_head += n;
                    }
                    None => prop_assert!(n > arena.free()),
                }
                prop_assert_eq!(arena.head(), expected_head);
                prop_assert!(arena.head() <= arena.tail());
            }
        }

        #[test]
        fn failed_requests_change_nothing(
            head in 0usize..32,
            tail in 0usize..32,
            extra in 1usize..8,
        ) {
            let mut arena = Arena::new(64);
            arena.allocate_head(head).unwrap();
            arena.allocate_tail(tail).unwrap();
            let before = arena.clone();
            let n = arena.free() + extra;
            prop_assert_eq!(arena.allocate_head(n), None);
            prop_assert_eq!(&arena, &before);
        }
    }
}
