use log::trace;
use nalgebra::{Dim, Matrix, StorageMut, U1};

use crate::{
    constants::{DIV_FLOPS, MULTSUB_FLOPS},
    walk::walk_u,
    Entry, Numeric, PatternSet,
};

impl<T: Entry> Numeric<T> {
    /// Solves `U x = b` in place: `x` holds `b` on input and the solution on return.
    ///
    /// `pattern` is workspace for the chain patterns and needs `n` entries, the order of the
    /// matrix, not just `npiv`: a chain pattern may hold columns past the last pivot. A zero on the
    /// diagonal is divided by anyway; the caller decides what an infinite or NaN result means.
    /// Returns the flop count. A non-square factorization is left alone and `0.0` returned.
    pub fn usolve<D, S>(&self, x: &mut Matrix<T, D, U1, S>, pattern: &mut [usize]) -> f64
    where
        D: Dim,
        S: StorageMut<T, D>,
    {
        if self.n_row != self.n_col {
            return 0.0;
        }
        let n = self.n_row;
        let npiv = self.npiv();
        debug_assert_eq!(x.nrows(), n);
        trace!("usolve: n = {}, npiv = {}, n1 = {}", n, npiv, self.n1());

        let d = &self.diagonal;

        // rows past the last pivot have no off-diagonal part
        for k in (npiv..n).rev() {
            x[k] /= d[k];
        }

        let mut pattern = PatternSet::new(pattern);
        walk_u(&self.store, &self.arena, &mut pattern, |k, cols, values: &[T]| {
            let mut xk = x[k];
            for (&col, &ukj) in cols.iter().zip(values) {
                xk -= ukj * x[col];
            }
            x[k] = xk / d[k];
        });

        DIV_FLOPS * n as f64 + MULTSUB_FLOPS * self.unz as f64
    }
}
