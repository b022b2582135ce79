use log::trace;
use nalgebra::{Dim, Matrix, StorageMut, U1};

use crate::{constants::MULTSUB_FLOPS, walk::walk_l, Entry, Numeric, PatternSet};

impl<T: Entry> Numeric<T> {
    /// Solves `L x = b` in place: `x` holds `b` on input and the solution on return.
    ///
    /// `pattern` is workspace for the chain patterns and needs `n` entries, the order of the
    /// matrix, not just `npiv`: a chain pattern may hold rows past the last pivot. Returns the flop
    /// count of the solve, which does not depend on how many columns were skipped for a zero
    /// `x[k]`.
    ///
    /// A non-square factorization is left alone: `x` is not touched and `0.0` is returned.
    pub fn lsolve<D, S>(&self, x: &mut Matrix<T, D, U1, S>, pattern: &mut [usize]) -> f64
    where
        D: Dim,
        S: StorageMut<T, D>,
    {
        if self.n_row != self.n_col {
            return 0.0;
        }
        debug_assert_eq!(x.nrows(), self.n_row);
        trace!("lsolve: n = {}, npiv = {}, n1 = {}", self.n_row, self.npiv(), self.n1());

        let mut pattern = PatternSet::new(pattern);
        walk_l(&self.store, &self.arena, &mut pattern, |k, rows, values: &[T]| {
            let xk = x[k];
            if xk != T::zero() {
                for (&row, &lik) in rows.iter().zip(values) {
                    x[row] -= xk * lik;
                }
            }
        });

        MULTSUB_FLOPS * self.lnz as f64
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{vector, DVector};

    use crate::{LLink, NumericBuilder, ULink};

    use super::*;

    /// The 3 x 3 unit lower triangular factor with `L[2,0] = 2` (singleton) and `L[2,1] = 3`.
    fn three_by_three() -> Numeric<f64> {
        let mut builder = NumericBuilder::new(3, 3, 1);
        builder.push_l_singleton(&[2], &[2.0]).unwrap();
        builder.push_l_column(LLink::ChainStart, &[2], &[3.0]).unwrap();
        builder
            .push_l_column(LLink::ChainContinuation { removal: 0 }, &[], &[])
            .unwrap();
        builder.push_u_singleton(&[], &[]).unwrap();
        builder.push_u_row(ULink::ChainStart { prev_pattern: &[] }, &[]).unwrap();
        builder
            .push_u_row(
                ULink::ChainContinuation {
                    added: 0,
                    restore: None,
                },
                &[],
            )
            .unwrap();
        builder
            .finish(vec![0, 1, 2], vec![0, 1, 2], DVector::from_element(3, 1.0), None)
            .unwrap()
    }

    #[test]
    fn test_lsolve_singleton_and_chain() {
        let numeric = three_by_three();
        let mut x = vector![1.0, 2.0, 3.0];
        let mut work = [0; 3];
        let flops = numeric.lsolve(&mut x, &mut work);
        assert_eq!(x, vector![1.0, 2.0, -5.0]);
        assert_eq!(flops, 4.0);
    }

    #[test]
    fn test_lsolve_skips_zero() {
        let numeric = three_by_three();
        let mut x = vector![0.0, 0.0, 3.0];
        let mut work = [0; 3];
        // the flop count is charged regardless
        assert_eq!(numeric.lsolve(&mut x, &mut work), 4.0);
        assert_eq!(x, vector![0.0, 0.0, 3.0]);
    }

    #[test]
    fn test_lsolve_chain_shares_rows() {
        // column 1 stores rows {2, 3}; column 2 inherits row 3 and adds none
        let mut builder = NumericBuilder::new(4, 4, 0);
        builder.push_l_column(LLink::ChainStart, &[], &[]).unwrap();
        builder
            .push_l_column(LLink::ChainStart, &[2, 3], &[0.5, 0.25])
            .unwrap();
        builder
            .push_l_column(LLink::ChainContinuation { removal: 0 }, &[], &[4.0])
            .unwrap();
        builder
            .push_l_column(LLink::ChainContinuation { removal: 0 }, &[], &[])
            .unwrap();
        for _ in 0..4 {
            builder.push_u_row(ULink::ChainStart { prev_pattern: &[] }, &[]).unwrap();
        }
        let numeric = builder
            .finish(
                vec![0, 1, 2, 3],
                vec![0, 1, 2, 3],
                DVector::from_element(4, 1.0),
                None,
            )
            .unwrap();

        let mut x = vector![1.0, 2.0, 1.0, 1.0];
        let mut work = [0; 4];
        numeric.lsolve(&mut x, &mut work);
        // x2 = 1 - 0.5 * 2 = 0, x3 = 1 - 0.25 * 2 - 4 * 0 = 0.5
        assert_relative_eq!(x, vector![1.0, 2.0, 0.0, 0.5]);
    }

    #[test]
    fn test_lsolve_not_square() {
        let mut builder = NumericBuilder::<f64>::new(3, 2, 0);
        builder.push_l_column(LLink::ChainStart, &[2], &[7.0]).unwrap();
        builder.push_u_row(ULink::ChainStart { prev_pattern: &[] }, &[]).unwrap();
        let numeric = builder
            .finish(vec![0, 1, 2], vec![0, 1], DVector::from_element(2, 1.0), None)
            .unwrap();

        let mut x = vector![1.0, 2.0, 3.0];
        let mut work = [0; 3];
        assert_eq!(numeric.lsolve(&mut x, &mut work), 0.0);
        assert_eq!(x, vector![1.0, 2.0, 3.0]);
    }
}
