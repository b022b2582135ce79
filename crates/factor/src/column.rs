//! Per-pivot descriptors of where `L` columns and `U` rows live and how their patterns chain.

use lu_arena::Offset;

/// Column `k` of `L`.
///
/// The arena holds, at `offset`, the `len` row indices this column stores explicitly, followed by
/// one value per entry of the column's full pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LColumn {
    /// A singleton pivot (`k < n1`). The `len` indices are the complete pattern.
    Singleton { offset: Offset, len: usize },
    /// First column of a chain. The pattern is exactly the `len` stored rows.
    ChainStart { offset: Offset, len: usize },
    /// Inherits the pattern of column `k - 1`, minus pivot row `k` found at position `removal`,
    /// plus the `len` stored rows.
    ChainContinuation {
        offset: Offset,
        len: usize,
        removal: usize,
    },
}

impl LColumn {
    pub fn offset(&self) -> Offset {
        match *self {
            Self::Singleton { offset, .. }
            | Self::ChainStart { offset, .. }
            | Self::ChainContinuation { offset, .. } => offset,
        }
    }

    /// Number of row indices stored for this column (not the full pattern size).
    pub fn explicit_len(&self) -> usize {
        match *self {
            Self::Singleton { len, .. }
            | Self::ChainStart { len, .. }
            | Self::ChainContinuation { len, .. } => len,
        }
    }

    pub(crate) fn with_offset(self, offset: Offset) -> Self {
        match self {
            Self::Singleton { len, .. } => Self::Singleton { offset, len },
            Self::ChainStart { len, .. } => Self::ChainStart { offset, len },
            Self::ChainContinuation { len, removal, .. } => Self::ChainContinuation {
                offset,
                len,
                removal,
            },
        }
    }
}

/// Row `k` of `U`.
///
/// Rows are consumed from the last pivot backwards, so a chain is entered at its last row: the
/// pattern of that row is the one left over from row `k + 1`, or the explicit last pattern of `U`
/// for `k = npiv - 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum URow {
    /// A singleton pivot (`k < n1`): `len` column indices, then `len` values.
    Singleton { offset: Offset, len: usize },
    /// Row `k` starts a chain. The `len` indices at `offset` are the full pattern of row `k - 1`
    /// (the last row of the previous chain); the values of row `k` follow them.
    ChainStart { offset: Offset, len: usize },
    /// Only the values of row `k` are stored. Row `k - 1` is obtained by dropping the `len`
    /// columns row `k` appended and, if `restore` is set, putting column `k` back at that position.
    ChainContinuation {
        offset: Offset,
        len: usize,
        restore: Option<usize>,
    },
}

impl URow {
    pub fn offset(&self) -> Offset {
        match *self {
            Self::Singleton { offset, .. }
            | Self::ChainStart { offset, .. }
            | Self::ChainContinuation { offset, .. } => offset,
        }
    }

    /// Number of column indices stored in the arena for this row.
    pub fn explicit_len(&self) -> usize {
        match *self {
            Self::Singleton { len, .. } | Self::ChainStart { len, .. } => len,
            Self::ChainContinuation { .. } => 0,
        }
    }

    pub(crate) fn with_offset(self, offset: Offset) -> Self {
        match self {
            Self::Singleton { len, .. } => Self::Singleton { offset, len },
            Self::ChainStart { len, .. } => Self::ChainStart { offset, len },
            Self::ChainContinuation { len, restore, .. } => Self::ChainContinuation {
                offset,
                len,
                restore,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_len() {
        let at = Offset::new(3);
        assert_eq!(LColumn::Singleton { offset: at, len: 2 }.explicit_len(), 2);
        assert_eq!(
            LColumn::ChainContinuation {
                offset: at,
                len: 1,
                removal: 0
            }
            .explicit_len(),
            1
        );
        // continuation rows of U only carry values
        assert_eq!(
            URow::ChainContinuation {
                offset: at,
                len: 4,
                restore: None
            }
            .explicit_len(),
            0
        );
        assert_eq!(URow::ChainStart { offset: at, len: 4 }.explicit_len(), 4);
    }

    #[test]
    fn test_with_offset() {
        let col = LColumn::ChainContinuation {
            offset: Offset::new(1),
            len: 2,
            removal: 5,
        };
        let moved = col.with_offset(Offset::new(9));
        assert_eq!(moved.offset(), Offset::new(9));
        assert_eq!(moved.explicit_len(), 2);

        let row = URow::ChainContinuation {
            offset: Offset::new(4),
            len: 1,
            restore: Some(0),
        };
        assert_eq!(
            row.with_offset(Offset::new(0)),
            URow::ChainContinuation {
                offset: Offset::new(0),
                len: 1,
                restore: Some(0)
            }
        );
    }
}
