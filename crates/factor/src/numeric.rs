//! The numeric factorization object.

use lu_arena::Arena;
use nalgebra::DVector;

use crate::{
    store::{l_block_units, u_block_units},
    walk::{walk_l, walk_u},
    Entry, Error, FactorStore, LColumn, PatternSet, URow,
};

/// Row scale factors `R` applied before factorization.
#[derive(Clone, Debug, PartialEq)]
pub struct Scaling<T: Entry> {
    /// one factor per row of `A`
    pub factors: DVector<T>,
    /// `true`: rows were multiplied by the factors, `false`: divided by them
    pub recip: bool,
}

/// The factors `P R A Q = L U` of an `n_row` by `n_col` sparse matrix.
///
/// `L` is unit lower triangular and `U` upper triangular with diagonal `D`; both are stored in one
/// arena as described by the [`FactorStore`]. A `Numeric` is produced by a [`crate::NumericBuilder`]
/// or loaded from disk, and is read-only afterwards except for [`Numeric::compact`].
#[derive(Clone, Debug, PartialEq)]
pub struct Numeric<T: Entry> {
    pub(crate) n_row: usize,
    pub(crate) n_col: usize,
    pub(crate) arena: Arena,
    pub(crate) store: FactorStore,
    /// row `k` of `P R A` is row `rperm[k]` of `R A`
    pub(crate) rperm: Vec<usize>,
    /// column `k` of `A Q` is column `cperm[k]` of `A`
    pub(crate) cperm: Vec<usize>,
    /// diagonal of `U`, of size `min(n_row, n_col)`
    pub(crate) diagonal: DVector<T>,
    pub(crate) scaling: Option<Scaling<T>>,
    /// entries stored for the off-diagonal part of `L`
    pub(crate) lnz: usize,
    /// entries stored for the off-diagonal part of `U`
    pub(crate) unz: usize,
}

impl<T: Entry> Numeric<T> {
    pub fn n_row(&self) -> usize {
        self.n_row
    }

    pub fn n_col(&self) -> usize {
        self.n_col
    }

    /// Number of pivots found by the factorization.
    pub fn npiv(&self) -> usize {
        self.store.npiv()
    }

    /// Number of singleton pivots.
    pub fn n1(&self) -> usize {
        self.store.n1()
    }

    pub fn lnz(&self) -> usize {
        self.lnz
    }

    pub fn unz(&self) -> usize {
        self.unz
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn store(&self) -> &FactorStore {
        &self.store
    }

    pub fn rperm(&self) -> &[usize] {
        &self.rperm
    }

    pub fn cperm(&self) -> &[usize] {
        &self.cperm
    }

    pub fn diagonal(&self) -> &DVector<T> {
        &self.diagonal
    }

    pub fn scaling(&self) -> Option<&Scaling<T>> {
        self.scaling.as_ref()
    }

    /// `true` if a zero appears on the diagonal of `U` (or fewer pivots than rows were found).
    pub fn is_singular(&self) -> bool {
        self.npiv() < self.n_row.min(self.n_col) || self.diagonal.iter().any(|d| *d == T::zero())
    }

    /// The strictly lower part of `L` as `(row, col, value)` triplets, in pivot order.
    pub fn lower_triplets(&self) -> Vec<(usize, usize, T)> {
        let mut work = vec![0; self.n_row.max(self.n_col)];
        let mut pattern = PatternSet::new(&mut work);
        let mut triplets = Vec::with_capacity(self.lnz);
        walk_l(&self.store, &self.arena, &mut pattern, |k, rows, values: &[T]| {
            triplets.extend(rows.iter().zip(values).map(|(&row, &v)| (row, k, v)));
        });
        triplets
    }

    /// The strictly upper part of `U` as `(row, col, value)` triplets, last pivot first.
    pub fn upper_triplets(&self) -> Vec<(usize, usize, T)> {
        let mut work = vec![0; self.n_row.max(self.n_col)];
        let mut pattern = PatternSet::new(&mut work);
        let mut triplets = Vec::with_capacity(self.unz);
        walk_u(&self.store, &self.arena, &mut pattern, |k, cols, values: &[T]| {
            triplets.extend(cols.iter().zip(values).map(|(&col, &v)| (k, col, v)));
        });
        triplets
    }

    /// Moves all factor data to the start of the arena, dropping unreferenced head space.
    ///
    /// Returns the number of units reclaimed. Values and patterns are unchanged.
    pub fn compact(&mut self) -> usize {
        let mut blocks = self.store.blocks::<T>();
        crate::compact::compact_blocks(&mut self.arena, &mut self.store, &mut blocks)
    }

    /// Checks that the object is structurally sound.
    ///
    /// Every chain is replayed: removal and restore positions must be in range, a removed row must
    /// be the pivot, every stored index must lie strictly past its pivot and inside the matrix,
    /// every block must lie inside the arena head, and the entry counts must match.
    pub fn validate(&self) -> Result<(), Error> {
        let n_row = self.n_row;
        let n_col = self.n_col;
        let n_inner = n_row.min(n_col);
        let npiv = self.store.npiv();
        let n1 = self.store.n1();

        if n_row == 0 || n_col == 0 {
            return invalid(format!("empty dimension {n_row} x {n_col}"));
        }
        if self.store.u_rows().len() != npiv {
            return invalid(format!(
                "{} columns of L but {} rows of U",
                npiv,
                self.store.u_rows().len()
            ));
        }
        if npiv > n_inner || n1 > npiv {
            return invalid(format!("npiv {npiv}, n1 {n1} for a {n_row} x {n_col} matrix"));
        }
        check_permutation("row", &self.rperm, n_row)?;
        check_permutation("column", &self.cperm, n_col)?;
        if self.diagonal.len() != n_inner {
            return invalid(format!("diagonal has {} entries", self.diagonal.len()));
        }
        if let Some(scaling) = &self.scaling {
            if scaling.factors.len() != n_row {
                return invalid(format!("{} row scale factors", scaling.factors.len()));
            }
        }

        let lnz = self.check_l()?;
        let unz = self.check_u()?;
        if lnz != self.lnz || unz != self.unz {
            return invalid(format!(
                "counted {lnz} entries in L and {unz} in U, recorded {} and {}",
                self.lnz, self.unz
            ));
        }
        Ok(())
    }

    fn check_block(&self, what: &str, k: usize, start: usize, units: usize) -> Result<(), Error> {
        let head = self.arena.head();
        if start > head || units > head - start {
            return invalid(format!(
                "{what} {k} spans {units} units from {start}, beyond the arena head {head}"
            ));
        }
        Ok(())
    }

    fn check_l(&self) -> Result<usize, Error> {
        let n1 = self.store.n1();
        let mut pattern: Vec<usize> = Vec::with_capacity(self.n_row);
        let mut mark = vec![usize::MAX; self.n_row];
        let mut lnz = 0;

        for (k, col) in self.store.l_columns().iter().enumerate() {
            let llen = col.explicit_len();
            if llen > self.n_row {
                return invalid(format!("column {k} of L lists {llen} rows"));
            }
            if k == n1 {
                // chains never inherit from a singleton
                pattern.clear();
            }
            match *col {
                LColumn::Singleton { .. } if k < n1 => pattern.clear(),
                LColumn::ChainStart { .. } if k >= n1 => pattern.clear(),
                LColumn::ChainContinuation { removal, .. } if k >= n1 => {
                    if removal >= pattern.len() || pattern[removal] != k {
                        return invalid(format!("column {k} of L removes position {removal}"));
                    }
                    pattern.swap_remove(removal);
                }
                _ => return invalid(format!("column {k} of L has the wrong kind for n1 = {n1}")),
            }

            let deg = pattern.len() + llen;
            self.check_block("column of L", k, col.offset().get(), l_block_units::<T>(col, deg))?;
            let rows = self.arena.slice::<usize>(col.offset(), llen);
            if let Some(&row) = rows.iter().find(|&&row| row <= k || row >= self.n_row) {
                return invalid(format!("column {k} of L holds row {row}"));
            }
            pattern.extend_from_slice(rows);
            if let Some(row) = repeated(&pattern, &mut mark, k) {
                return invalid(format!("column {k} of L holds row {row} twice"));
            }
            lnz += deg;
        }
        Ok(lnz)
    }

    fn check_u(&self) -> Result<usize, Error> {
        let n1 = self.store.n1();
        let rows = self.store.u_rows();
        let npiv = rows.len();
        let mut pattern = self.store.upattern().to_vec();
        let mut mark = vec![usize::MAX; self.n_col];
        let mut unz = 0;

        if npiv > 0 {
            if let Some(&col) = pattern.iter().find(|&&col| col < npiv || col >= self.n_col) {
                return invalid(format!("last pattern of U holds column {col}"));
            }
            if let Some(col) = repeated(&pattern, &mut mark, npiv) {
                return invalid(format!("last pattern of U holds column {col} twice"));
            }
        } else if !pattern.is_empty() {
            return invalid("last pattern of U without any pivot".to_string());
        }

        for k in (n1..npiv).rev() {
            let row = rows[k];
            if matches!(row, URow::Singleton { .. }) {
                return invalid(format!("row {k} of U is a singleton past n1 = {n1}"));
            }
            if row.explicit_len() > self.n_col {
                return invalid(format!("row {k} of U lists {} columns", row.explicit_len()));
            }
            if let Some(&col) = pattern.iter().find(|&&col| col <= k || col >= self.n_col) {
                return invalid(format!("row {k} of U holds column {col}"));
            }
            if let Some(col) = repeated(&pattern, &mut mark, k) {
                return invalid(format!("row {k} of U holds column {col} twice"));
            }
            let deg = pattern.len();
            self.check_block("row of U", k, row.offset().get(), u_block_units::<T>(&row, deg))?;
            unz += deg;

            if k == n1 {
                break;
            }
            match row {
                URow::Singleton { offset, len } | URow::ChainStart { offset, len } => {
                    pattern.clear();
                    pattern.extend_from_slice(self.arena.slice::<usize>(offset, len));
                }
                URow::ChainContinuation { len, restore, .. } => {
                    if len > deg {
                        return invalid(format!("row {k} of U drops {len} of {deg} columns"));
                    }
                    pattern.truncate(deg - len);
                    if let Some(pos) = restore {
                        if pos > pattern.len() {
                            return invalid(format!("row {k} of U restores at position {pos}"));
                        }
                        pattern.push(k);
                        let last = pattern.len() - 1;
                        pattern.swap(pos, last);
                    }
                }
            }
        }

        for (k, row) in rows.iter().enumerate().take(n1) {
            let URow::Singleton { offset, len } = *row else {
                return invalid(format!("row {k} of U must be a singleton"));
            };
            if len > self.n_col {
                return invalid(format!("row {k} of U lists {len} columns"));
            }
            self.check_block("row of U", k, offset.get(), u_block_units::<T>(row, len))?;
            let cols = self.arena.slice::<usize>(offset, len);
            if let Some(&col) = cols.iter().find(|&&col| col <= k || col >= self.n_col) {
                return invalid(format!("row {k} of U holds column {col}"));
            }
            if let Some(col) = repeated(cols, &mut mark, k) {
                return invalid(format!("row {k} of U holds column {col} twice"));
            }
            unz += len;
        }
        Ok(unz)
    }
}

fn invalid<X>(reason: String) -> Result<X, Error> {
    Err(Error::InvalidNumeric { reason })
}

/// First index of `pattern` already stamped with `stamp`. Every index must be below `mark.len()`.
fn repeated(pattern: &[usize], mark: &mut [usize], stamp: usize) -> Option<usize> {
    pattern
        .iter()
        .copied()
        .find(|&i| std::mem::replace(&mut mark[i], stamp) == stamp)
}

fn check_permutation(what: &str, perm: &[usize], n: usize) -> Result<(), Error> {
    if perm.len() != n {
        return invalid(format!("{what} permutation has {} entries, expected {n}", perm.len()));
    }
    let mut seen = vec![false; n];
    for &i in perm {
        if i >= n || std::mem::replace(&mut seen[i], true) {
            return invalid(format!("{what} permutation repeats or exceeds index {i}"));
        }
    }
    Ok(())
}
