//! Bernstein polynomials on the reference interval `[-1, 1]` and their
//! tensor product on the reference square.
//!
//! The extraction data describes every spline basis function on an element as a
//! combination of these 16 bicubic modes, so the ordering returned by
//! [`tensor_product`] is part of the file format.

use nalgebra::allocator::Allocator;
use nalgebra::dimension::{Const, Dim};
use nalgebra::{DefaultAllocator, Matrix4, OMatrix, RealField, SVector, Vector4};
use once_cell::sync::Lazy;
use smallvec::{smallvec, SmallVec};

use crate::npolynomial::{OPolynomial, Polynomial};

/// Number of cubic bernstein polynomials per parametric direction
pub const CUBIC_MODES: usize = 4;

/// Number of bicubic tensor product modes on an element
pub const BEZIER_MODES: usize = CUBIC_MODES * CUBIC_MODES;

/// Computes the bernstein polynomial basis for a given degree on `[0, 1]`
///
/// `cols` is the number of polynomials i.e. the degree plus one.
/// Each row is a different bernstein polynomial and each column the coefficient of one power,
/// so the result can be wrapped in a [`Polynomial`] and evaluated directly.
pub fn bernstein_polynomials<T: RealField, C: Dim>(cols: C) -> OMatrix<T, C, C>
where
    DefaultAllocator: Allocator<T, C, C>,
{
    let mut polynomials = OMatrix::zeros_generic(cols, cols);
    let n = cols.value();
    if n == 0 {
        return polynomials;
    }
    let degree = n - 1;

    // b_i(x) = binom(d, i) x^i (1-x)^(d-i)
    //        = sum_k binom(d, i) binom(d-i, k-i) (-1)^(k-i) x^k
    let outer = pascal_row::<T>(degree);
    for i in 0..n {
        let inner = pascal_row::<T>(degree - i);
        for k in i..n {
            let coeff = outer[i].clone() * inner[k - i].clone();
            polynomials[(i, k)] = if (k - i) % 2 == 1 { -coeff } else { coeff };
        }
    }

    polynomials
}

/// The `n`-th row of pascal's triangle
fn pascal_row<T: RealField>(n: usize) -> SmallVec<[T; 8]> {
    let mut row: SmallVec<[T; 8]> = smallvec![T::one()];
    for _ in 0..n {
        let mut next: SmallVec<[T; 8]> = SmallVec::with_capacity(row.len() + 1);
        next.push(T::one());
        for pair in row.windows(2) {
            next.push(pair[0].clone() + pair[1].clone());
        }
        next.push(T::one());
        row = next;
    }
    row
}

/// Maps `u` from the reference interval `[-1, 1]` onto `[0, 1]`.
#[inline]
pub fn to_unit_interval(u: f64) -> f64 {
    0.5 * (1.0 + u)
}

/// The four cubic bernstein polynomials evaluated at `u` in `[-1, 1]`
///
/// Their sum is always one.
pub fn cubic(u: f64) -> Vector4<f64> {
    CUBIC_BASIS.evaluate(to_unit_interval(u))
}

type CubicBasis = OPolynomial<f64, Const<CUBIC_MODES>, Const<CUBIC_MODES>>;

static CUBIC_BASIS: Lazy<CubicBasis> = Lazy::new(|| {
    let coefficients: Matrix4<f64> = bernstein_polynomials(Const::<CUBIC_MODES>);
    Polynomial(coefficients)
});

/// The 16 bicubic bernstein modes evaluated at `(u, v)` in `[-1, 1]^2`
///
/// Mode `4*j + i` is `M[i] * N[j]` with `M = cubic(u)` and `N = cubic(v)`,
/// i.e. the `u` index runs fastest.
pub fn tensor_product(u: f64, v: f64) -> SVector<f64, BEZIER_MODES> {
    let m = CUBIC_BASIS.evaluate(to_unit_interval(u));
    let n = CUBIC_BASIS.evaluate(to_unit_interval(v));

    // Column major storage of the outer product already puts `i` fastest
    let outer: Matrix4<f64> = m * n.transpose();
    SVector::from_column_slice(outer.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix1, Matrix2, Matrix3, RowVector1, RowVector2, RowVector3, RowVector4};

    #[test]
    fn bernstein() {
        assert_eq!(
            bernstein_polynomials::<f32, _>(Const::<1>),
            Matrix1::from_rows(&[RowVector1::new(1.0),])
        );
        assert_eq!(
            bernstein_polynomials::<f32, _>(Const::<2>),
            Matrix2::from_rows(&[RowVector2::new(1.0, -1.0), RowVector2::new(0.0, 1.0),])
        );
        assert_eq!(
            bernstein_polynomials::<f32, _>(Const::<3>),
            Matrix3::from_rows(&[
                RowVector3::new(1.0, -2.0, 1.0),
                RowVector3::new(0.0, 2.0, -2.0),
                RowVector3::new(0.0, 0.0, 1.0),
            ])
        );
        assert_eq!(
            bernstein_polynomials::<f32, _>(Const::<4>),
            Matrix4::from_rows(&[
                RowVector4::new(1.0, -3.0, 3.0, -1.0),
                RowVector4::new(0.0, 3.0, -6.0, 3.0),
                RowVector4::new(0.0, 0.0, 3.0, -3.0),
                RowVector4::new(0.0, 0.0, 0.0, 1.0),
            ])
        );
    }

    #[test]
    fn cubic_matches_closed_form() {
        for i in 0..=20 {
            let u = -1.0 + i as f64 / 10.0;
            let x = to_unit_interval(u);
            let expected = Vector4::new(
                (1.0 - x).powi(3),
                3.0 * x * (1.0 - x).powi(2),
                3.0 * x.powi(2) * (1.0 - x),
                x.powi(3),
            );
            assert!((cubic(u) - expected).norm() < 1e-14, "u = {}", u);
        }
    }

    #[test]
    fn cubic_partition_of_unity() {
        for i in 0..=200 {
            let u = -1.0 + i as f64 / 100.0;
            assert!((cubic(u).sum() - 1.0).abs() < 1e-14, "u = {}", u);
        }
    }

    #[test]
    fn cubic_interpolates_ends() {
        assert_eq!(cubic(-1.0), Vector4::new(1.0, 0.0, 0.0, 0.0));
        assert_eq!(cubic(1.0), Vector4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn tensor_product_ordering() {
        let (u, v) = (-0.3, 0.45);
        let m = cubic(u);
        let n = cubic(v);
        let bern = tensor_product(u, v);
        for j in 0..CUBIC_MODES {
            for i in 0..CUBIC_MODES {
                assert_eq!(bern[4 * j + i], m[i] * n[j]);
            }
        }
        assert!((bern.sum() - 1.0).abs() < 1e-14);
    }

    #[test]
    fn tensor_product_corners() {
        // Only the corner mode is active at a corner of the reference square
        for (u, v, mode) in [(-1.0, -1.0, 0), (1.0, -1.0, 3), (-1.0, 1.0, 12), (1.0, 1.0, 15)] {
            let bern = tensor_product(u, v);
            assert_eq!(bern[mode], 1.0);
            assert_eq!(bern.sum(), 1.0);
        }
    }

    #[test]
    fn cubic_basis_shared_between_threads() {
        assert_eq!(CUBIC_BASIS.0, bernstein_polynomials::<f64, _>(Const::<CUBIC_MODES>));
        let expected = tensor_product(0.25, -0.5);
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| tensor_product(0.25, -0.5)))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }
}
