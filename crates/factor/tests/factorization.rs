use approx::assert_relative_eq;
use lu_factor::{LLink, Numeric, NumericBuilder, Scaling, ULink};
use nalgebra::{DMatrix, DVector};

const N: usize = 5;
const RPERM: [usize; N] = [2, 0, 4, 1, 3];
const CPERM: [usize; N] = [1, 3, 0, 4, 2];
const RS: [f64; N] = [2.0, 1.0, 0.5, 4.0, 1.0];

/// One singleton pivot followed by a single chain in both `L` and `U`.
fn factorization(diagonal: [f64; N]) -> Numeric<f64> {
    let mut builder = NumericBuilder::new(N, N, 1);

    builder.push_l_singleton(&[3], &[0.5]).unwrap();
    builder.push_l_column(LLink::ChainStart, &[2, 4], &[0.25, -1.0]).unwrap();
    // drops row 2, keeps 4, adds 3
    builder
        .push_l_column(LLink::ChainContinuation { removal: 0 }, &[3], &[2.0, 0.5])
        .unwrap();
    // drops row 3 from [4, 3]
    builder
        .push_l_column(LLink::ChainContinuation { removal: 1 }, &[], &[1.5])
        .unwrap();
    builder
        .push_l_column(LLink::ChainContinuation { removal: 0 }, &[], &[])
        .unwrap();

    builder.push_u_singleton(&[2, 4], &[1.0, -2.0]).unwrap();
    builder
        .push_u_row(ULink::ChainStart { prev_pattern: &[] }, &[1.0, 0.5])
        .unwrap();
    for (added, values) in [(1, &[-1.0, 2.0][..]), (0, &[0.25][..]), (0, &[][..])] {
        builder
            .push_u_row(
                ULink::ChainContinuation {
                    added,
                    restore: Some(0),
                },
                values,
            )
            .unwrap();
    }

    builder
        .finish(
            RPERM.to_vec(),
            CPERM.to_vec(),
            DVector::from_row_slice(&diagonal),
            Some(Scaling {
                factors: DVector::from_row_slice(&RS),
                recip: false,
            }),
        )
        .unwrap()
}

/// Rebuilds `A` from `P R A Q = L U` with dense arithmetic.
fn reconstruct(numeric: &Numeric<f64>) -> DMatrix<f64> {
    let mut l = DMatrix::identity(N, N);
    for (i, j, v) in numeric.lower_triplets() {
        l[(i, j)] = v;
    }
    let mut u = DMatrix::from_diagonal(numeric.diagonal());
    for (i, j, v) in numeric.upper_triplets() {
        u[(i, j)] = v;
    }
    let lu = l * u;

    let mut a = DMatrix::zeros(N, N);
    for i in 0..N {
        for j in 0..N {
            let row = numeric.rperm()[i];
            a[(row, numeric.cperm()[j])] = lu[(i, j)] * RS[row];
        }
    }
    a
}

#[test]
fn solve_matches_dense() {
    let numeric = factorization([2.0, 4.0, -1.0, 3.0, 5.0]);
    assert_eq!(numeric.lnz(), 6);
    assert_eq!(numeric.unz(), 7);
    assert!(!numeric.is_singular());

    let a = reconstruct(&numeric);
    let expected = DVector::from_row_slice(&[1.0, -2.0, 0.5, 3.0, -1.0]);
    let b = &a * &expected;

    let mut x = DVector::zeros(N);
    let info = numeric.solve(&b, &mut x).unwrap();
    assert_relative_eq!(x, expected, epsilon = 1e-12);
    // scaling + L + U
    assert_eq!(info.flops, 5.0 + 12.0 + (5.0 + 14.0));
    assert!(!info.singular);
}

#[test]
fn compact_after_build_is_a_no_op() {
    let mut numeric = factorization([2.0, 4.0, -1.0, 3.0, 5.0]);
    let before = numeric.clone();
    assert_eq!(numeric.compact(), 0);
    assert_eq!(numeric, before);
}

#[test]
fn save_and_load() {
    let numeric = factorization([2.0, 4.0, -1.0, 3.0, 5.0]);
    let path = std::env::temp_dir().join(format!("lu-factor-{}.bin", std::process::id()));
    numeric.save(&path).unwrap();
    let loaded = Numeric::<f64>::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded, numeric);

    let b = DVector::from_row_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    let mut x = DVector::zeros(N);
    let mut y = DVector::zeros(N);
    numeric.solve(&b, &mut x).unwrap();
    loaded.solve(&b, &mut y).unwrap();
    assert_eq!(x, y);
}

#[test]
fn singular_solve_is_reported() {
    let numeric = factorization([2.0, 4.0, 0.0, 3.0, 5.0]);
    assert!(numeric.is_singular());
    let b = DVector::from_element(N, 1.0);
    let mut x = DVector::zeros(N);
    let info = numeric.solve(&b, &mut x).unwrap();
    assert!(info.singular);
    assert!(x.iter().any(|v| !v.is_finite()));
}
