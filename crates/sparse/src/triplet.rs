//! Conversion of triplet input into compressed-column form.

use std::ops::AddAssign;

use log::debug;
use num_traits::Zero;

use crate::Error;

/// A matrix in compressed-column form with the row indices of every column sorted.
#[derive(Clone, Debug, PartialEq)]
pub struct CompressedCol<T> {
    pub n_row: usize,
    pub n_col: usize,
    /// column `j` occupies `col_ptr[j]..col_ptr[j + 1]`
    pub col_ptr: Vec<usize>,
    pub row_idx: Vec<usize>,
    /// summed values, if values were given
    pub values: Option<Vec<T>>,
    /// `map[t]` is the slot that triplet `t` was summed into
    pub map: Option<Vec<usize>>,
}

impl<T> CompressedCol<T> {
    /// Number of stored entries, after duplicates were summed.
    pub fn nnz(&self) -> usize {
        self.row_idx.len()
    }

    /// Row indices of column `j`.
    pub fn column(&self, j: usize) -> &[usize] {
        &self.row_idx[self.col_ptr[j]..self.col_ptr[j + 1]]
    }
}

/// Converts triplets `(ti[t], tj[t], tx[t])` of an `n_row` by `n_col` matrix.
///
/// Duplicate entries are summed. Without `tx` only the pattern is built. With `want_map` the
/// result also records where each triplet ended up. All arguments are checked before any work is
/// done.
pub fn triplet_to_col<T>(
    n_row: usize,
    n_col: usize,
    ti: &[usize],
    tj: &[usize],
    tx: Option<&[T]>,
    want_map: bool,
) -> Result<CompressedCol<T>, Error>
where
    T: Copy + Zero + AddAssign,
{
    if n_row == 0 || n_col == 0 {
        return Err(Error::NonPositiveDimension { n_row, n_col });
    }
    let nz = ti.len();
    if tj.len() != nz {
        return Err(Error::ArgumentMissing {
            what: "column indices",
        });
    }
    if tx.map_or(false, |tx| tx.len() != nz) {
        return Err(Error::ArgumentMissing { what: "values" });
    }
    if let Some(t) = (0..nz).find(|&t| ti[t] >= n_row || tj[t] >= n_col) {
        return Err(Error::InvalidMatrix {
            reason: format!("triplet {} at ({}, {}) is out of range", t, ti[t], tj[t]),
        });
    }

    // row form, in input order within each row
    let row_ptr = pointers(n_row, ti.iter().copied());
    let mut next = row_ptr.clone();
    let mut rj = vec![0; nz];
    let mut rx = tx.map(|_| vec![T::zero(); nz]);
    // row-form slot of every triplet
    let mut slot = vec![0; nz];
    for t in 0..nz {
        let p = next[ti[t]];
        next[ti[t]] += 1;
        rj[p] = tj[t];
        if let (Some(rx), Some(tx)) = (rx.as_mut(), tx) {
            rx[p] = tx[t];
        }
        slot[t] = p;
    }

    // sum duplicates within each row, compacting rows in place
    let mut first_in_row: Vec<Option<usize>> = vec![None; n_col];
    let mut moved = vec![0; nz];
    let mut row_len = vec![0; n_row];
    let mut dest = 0;
    for i in 0..n_row {
        let start = dest;
        for p in row_ptr[i]..row_ptr[i + 1] {
            let j = rj[p];
            match first_in_row[j] {
                Some(q) if q >= start => {
                    if let Some(rx) = rx.as_mut() {
                        let v = rx[p];
                        rx[q] += v;
                    }
                    moved[p] = q;
                }
                _ => {
                    first_in_row[j] = Some(dest);
                    rj[dest] = j;
                    if let Some(rx) = rx.as_mut() {
                        rx[dest] = rx[p];
                    }
                    moved[p] = dest;
                    dest += 1;
                }
            }
        }
        row_len[i] = dest - start;
    }
    let nnz = dest;

    // transpose; visiting rows in order leaves every column sorted
    let col_ptr = pointers(n_col, rj[..nnz].iter().copied());
    let mut next = col_ptr.clone();
    let mut row_idx = vec![0; nnz];
    let mut values = rx.as_ref().map(|_| vec![T::zero(); nnz]);
    let mut column_slot = vec![0; nnz];
    let mut p = 0;
    for (i, &len) in row_len.iter().enumerate() {
        for _ in 0..len {
            let j = rj[p];
            let cp = next[j];
            next[j] += 1;
            row_idx[cp] = i;
            if let (Some(values), Some(rx)) = (values.as_mut(), rx.as_ref()) {
                values[cp] = rx[p];
            }
            column_slot[p] = cp;
            p += 1;
        }
    }

    let map = want_map.then(|| slot.iter().map(|&p| column_slot[moved[p]]).collect());
    debug!(
        "triplet_to_col: {} x {}, {} triplets, {} entries",
        n_row, n_col, nz, nnz
    );

    Ok(CompressedCol {
        n_row,
        n_col,
        col_ptr,
        row_idx,
        values,
        map,
    })
}

/// Start of every bucket `0..n` (plus the end) for the given bucket of each item.
fn pointers(n: usize, buckets: impl Iterator<Item = usize>) -> Vec<usize> {
    let mut ptr = vec![0; n + 1];
    for b in buckets {
        ptr[b + 1] += 1;
    }
    for k in 0..n {
        ptr[k + 1] += ptr[k];
    }
    ptr
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_and_summed() {
        // [[1, 0, 2],
        //  [0, 3, 0],
        //  [4, 5, 6]] with (2, 2) split in two and given out of order
        let ti = [2, 0, 1, 2, 0, 2, 2];
        let tj = [2, 2, 1, 0, 0, 1, 2];
        let tx = [4.0, 2.0, 3.0, 4.0, 1.0, 5.0, 2.0];
        let a = triplet_to_col(3, 3, &ti, &tj, Some(&tx[..]), true).unwrap();

        assert_eq!(a.col_ptr, vec![0, 2, 4, 6]);
        assert_eq!(a.row_idx, vec![0, 2, 1, 2, 0, 2]);
        assert_eq!(a.values, Some(vec![1.0, 4.0, 3.0, 5.0, 2.0, 6.0]));
        assert_eq!(a.map, Some(vec![5, 4, 2, 1, 0, 3, 5]));
        assert_eq!(a.nnz(), 6);
        assert_eq!(a.column(2), &[0, 2]);
    }

    #[test]
    fn test_pattern_only() {
        let a = triplet_to_col::<f64>(2, 3, &[1, 0, 1], &[2, 2, 2], None, false).unwrap();
        assert_eq!(a.col_ptr, vec![0, 0, 0, 2]);
        assert_eq!(a.row_idx, vec![0, 1]);
        assert_eq!(a.values, None);
        assert_eq!(a.map, None);
    }

    #[test]
    fn test_empty_matrix() {
        let a = triplet_to_col::<f64>(2, 2, &[], &[], Some(&[][..]), true).unwrap();
        assert_eq!(a.col_ptr, vec![0, 0, 0]);
        assert!(a.row_idx.is_empty());
        assert_eq!(a.map, Some(vec![]));
    }

    #[test]
    fn test_rejected_inputs() {
        assert!(matches!(
            triplet_to_col::<f64>(0, 2, &[], &[], None, false),
            Err(Error::NonPositiveDimension { n_row: 0, n_col: 2 })
        ));
        assert!(matches!(
            triplet_to_col::<f64>(2, 2, &[0, 1], &[0], None, false),
            Err(Error::ArgumentMissing { .. })
        ));
        assert!(matches!(
            triplet_to_col(2, 2, &[0], &[0], Some(&[1.0, 2.0][..]), false),
            Err(Error::ArgumentMissing { what: "values" })
        ));
        assert!(matches!(
            triplet_to_col::<f64>(2, 2, &[0, 2], &[0, 1], None, false),
            Err(Error::InvalidMatrix { .. })
        ));
    }
}
