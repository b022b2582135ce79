use log::{trace, warn};
use nalgebra::{DVector, Dim, Matrix, Storage, StorageMut, U1};

use crate::{constants::DIV_FLOPS, Entry, Error, Numeric};

/// Statistics of one call to [`Numeric::solve`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SolveInfo {
    /// floating point operations performed, including scaling
    pub flops: f64,
    /// a zero diagonal entry of `U` was divided by
    pub singular: bool,
}

impl<T: Entry> Numeric<T> {
    /// Solves `A x = b` using the factorization `P R A Q = L U`.
    ///
    /// Computes `x = Q U⁻¹ L⁻¹ P R b`. A singular factorization still produces an `x` (with
    /// infinite or NaN entries) and is reported through [`SolveInfo::singular`].
    pub fn solve<D, SB, SX>(
        &self,
        b: &Matrix<T, D, U1, SB>,
        x: &mut Matrix<T, D, U1, SX>,
    ) -> Result<SolveInfo, Error>
    where
        D: Dim,
        SB: Storage<T, D>,
        SX: StorageMut<T, D>,
    {
        if self.n_row != self.n_col {
            return Err(Error::NotSquare {
                n_row: self.n_row,
                n_col: self.n_col,
            });
        }
        let n = self.n_row;
        for len in [b.nrows(), x.nrows()] {
            if len != n {
                return Err(Error::DimensionMismatch {
                    expected: n,
                    found: len,
                });
            }
        }

        let mut flops = 0.0;
        let mut y = DVector::<T>::zeros(n);

        // y = P R b
        match &self.scaling {
            Some(scaling) => {
                let rs = &scaling.factors;
                for (yk, &row) in y.iter_mut().zip(&self.rperm) {
                    *yk = if scaling.recip {
                        b[row] * rs[row]
                    } else {
                        b[row] / rs[row]
                    };
                }
                flops += DIV_FLOPS * n as f64;
            }
            None => {
                for (yk, &row) in y.iter_mut().zip(&self.rperm) {
                    *yk = b[row];
                }
            }
        }

        let mut pattern = vec![0; n];
        flops += self.lsolve(&mut y, &mut pattern);
        flops += self.usolve(&mut y, &mut pattern);

        // x = Q y
        for (&col, &yk) in self.cperm.iter().zip(y.iter()) {
            x[col] = yk;
        }

        let singular = self.is_singular();
        if singular {
            warn!(
                "solve: the matrix is singular ({} pivots for n = {}), the solution holds inf or NaN",
                self.npiv(),
                n
            );
        }
        trace!("solve: n = {}, flops = {}", n, flops);

        Ok(SolveInfo { flops, singular })
    }
}
