//! Storage granules and offsets into the arena.

use std::fmt;

/// One storage granule of the arena.
///
/// A unit is wide enough to hold one `usize` index or one `f64` entry, so every offset into the
/// arena can be computed in units regardless of what is stored there. Wider entries (e.g. complex
/// values) simply span several units.
pub type Unit = u64;

/// Number of units needed to hold `n` contiguous objects of type `X`.
#[inline]
pub const fn units_of<X>(n: usize) -> usize {
    let unit = std::mem::size_of::<Unit>();
    (n * std::mem::size_of::<X>() + unit - 1) / unit
}

/// A position inside an [`crate::Arena`], counted in units from the start of the buffer.
///
/// Offsets are deliberately distinct from plain array indices: an `Offset` is only meaningful
/// relative to the arena that handed it out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[must_use]
pub struct Offset(usize);

impl Offset {
    pub const fn new(units: usize) -> Self {
        Offset(units)
    }

    /// Position in units from the start of the arena.
    pub const fn get(self) -> usize {
        self.0
    }

    /// The offset `units` further into the arena.
    pub const fn add(self, units: usize) -> Self {
        Offset(self.0 + units)
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_of() {
        assert_eq!(units_of::<f64>(0), 0);
        assert_eq!(units_of::<f64>(3), 3);
        assert_eq!(units_of::<u64>(5), 5);
        // narrower objects pack into a unit
        assert_eq!(units_of::<f32>(3), 2);
        assert_eq!(units_of::<u32>(4), 2);
        // wider objects span units
        assert_eq!(units_of::<[f64; 2]>(3), 6);
    }

    #[test]
    fn test_offset() {
        let p = Offset::new(7);
        assert_eq!(p.get(), 7);
        assert_eq!(p.add(3), Offset::new(10));
        assert!(Offset::new(2) < p);
        assert_eq!(p.to_string(), "@7");
    }
}
