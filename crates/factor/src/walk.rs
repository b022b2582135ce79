//! Decoding of the chained factor layout, one pivot at a time.
//!
//! Both walks hand the visitor each pivot `k` together with its full pattern and the values
//! aligned with it. They trust the layout: malformed chains are caught by debug assertions only,
//! the structural check lives in `Numeric::validate`.

use lu_arena::{units_of, Arena};

use crate::{Entry, FactorStore, LColumn, PatternSet, URow};

/// Visits the columns of `L` in pivot order.
pub(crate) fn walk_l<T, F>(store: &FactorStore, arena: &Arena, pattern: &mut PatternSet, mut f: F)
where
    T: Entry,
    F: FnMut(usize, &[usize], &[T]),
{
    let n1 = store.n1();
    let columns = store.l_columns();

    // singletons
    for (k, col) in columns.iter().enumerate().take(n1) {
        let deg = col.explicit_len();
        let rows = arena.slice::<usize>(col.offset(), deg);
        let values = arena.slice::<T>(col.offset().add(units_of::<usize>(deg)), deg);
        f(k, rows, values);
    }

    // rest of L
    pattern.clear();
    for (k, col) in columns.iter().enumerate().skip(n1) {
        match *col {
            LColumn::Singleton { .. } | LColumn::ChainStart { .. } => pattern.clear(),
            LColumn::ChainContinuation { removal, .. } => {
                debug_assert!(!pattern.is_empty());
                debug_assert_eq!(pattern.as_slice()[removal], k);
                pattern.remove(removal);
            }
        }

        let llen = col.explicit_len();
        let rows = arena.slice::<usize>(col.offset(), llen);
        debug_assert!(rows.iter().all(|&row| row > k));
        pattern.extend(rows);

        let values = arena.slice::<T>(col.offset().add(units_of::<usize>(llen)), pattern.len());
        f(k, pattern.as_slice(), values);
    }
}

/// Visits the rows of `U` from the last pivot down to the first.
///
/// The chained rows `npiv - 1 ..= n1` come first, then the singleton rows `n1 - 1 ..= 0`.
pub(crate) fn walk_u<T, F>(store: &FactorStore, arena: &Arena, pattern: &mut PatternSet, mut f: F)
where
    T: Entry,
    F: FnMut(usize, &[usize], &[T]),
{
    let n1 = store.n1();
    let rows = store.u_rows();

    pattern.load(store.upattern());
    for k in (n1..rows.len()).rev() {
        let row = rows[k];
        let values_at = row.offset().add(units_of::<usize>(row.explicit_len()));
        let values = arena.slice::<T>(values_at, pattern.len());
        debug_assert!(pattern.iter().all(|&col| col > k));
        f(k, pattern.as_slice(), values);

        // make row k-1 of U
        if k == n1 {
            break;
        }
        match row {
            URow::Singleton { offset, len } | URow::ChainStart { offset, len } => {
                pattern.load(arena.slice::<usize>(offset, len));
            }
            URow::ChainContinuation { len, restore, .. } => {
                pattern.pop(len);
                if let Some(pos) = restore {
                    pattern.restore(pos, k);
                }
            }
        }
    }

    // singletons
    for k in (0..n1.min(rows.len())).rev() {
        let row = rows[k];
        let deg = row.explicit_len();
        let cols = arena.slice::<usize>(row.offset(), deg);
        let values = arena.slice::<T>(row.offset().add(units_of::<usize>(deg)), deg);
        f(k, cols, values);
    }
}
