//! A wrapper around [`nalgebra::Matrix`] interpreting it as a set of polynomials.

use nalgebra::allocator::Allocator;
use nalgebra::dimension::{Dim, DimName, U1};
use nalgebra::storage::{Storage, StorageMut};
use nalgebra::{DefaultAllocator, Field, Matrix, OVector, Owned, Scalar};

/// [`Polynomial`] owning its coefficients.
pub type OPolynomial<T, R, C> = Polynomial<T, R, C, Owned<T, R, C>>;

/// Wrapper around [`nalgebra::Matrix`] interpreting it as a polynomial:
/// $p: \R \to \R^r $ where $r$ is the number of rows i.e. the generic `R` parameter
///
/// Each row is one scalar polynomial and each column holds the coefficients of one power,
/// starting with the constant term.
/// A basis of `r` polynomials (like the bernstein basis) is therefore a single `Polynomial`
/// whose evaluation yields all basis values at once.
pub struct Polynomial<T, R, C, S>(pub Matrix<T, R, C, S>);

impl<T: Scalar, R: DimName, C: Dim, S: Storage<T, R, C>> Polynomial<T, R, C, S> {
    /// Evaluate `self` at position `x` and store the result into `out`.
    ///
    /// Uses horner's scheme, highest power first.
    pub fn evaluate_to<S2>(&self, x: T, out: &mut Matrix<T, R, U1, S2>)
    where
        T: Field,
        S2: StorageMut<T, R, U1>,
    {
        out.fill(T::zero());
        let ncols = self.0.ncols();
        if ncols == 0 {
            return;
        }
        for i in (1..ncols).rev() {
            *out += self.0.column(i);
            *out *= x.clone();
        }
        *out += self.0.column(0);
    }

    /// Evaluate `self` at position `x`.
    pub fn evaluate(&self, x: T) -> OVector<T, R>
    where
        T: Field,
        DefaultAllocator: Allocator<T, R>,
    {
        let mut out = OVector::from_element(T::zero());
        self.evaluate_to(x, &mut out);
        out
    }
}
