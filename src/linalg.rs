//! Small dense linear-algebra wrappers used by the block solvers.
//!
//! Everything here is a thin, shape-checked layer over `nalgebra`:
//! - `project`: the layer response `W * A_prev`
//! - `pinv`: Moore-Penrose pseudoinverse via SVD
//! - `solve_spd`: Cholesky solve for symmetric positive-definite systems

use nalgebra::DMatrix;

use crate::error::ensure_shape;
use crate::{Error, Result};

/// Compute `w * a_prev`, checking that the inner dimensions agree.
#[inline]
pub(crate) fn project(w: &DMatrix<f64>, a_prev: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    if w.ncols() != a_prev.nrows() {
        return Err(Error::ShapeMismatch {
            what: "layer input (W * A_prev)",
            expected: (w.ncols(), a_prev.ncols()),
            actual: a_prev.shape(),
        });
    }
    Ok(w * a_prev)
}

/// Moore-Penrose pseudoinverse.
///
/// Singular values below `max(rows, cols) * f64::EPSILON * sigma_max` are treated as
/// zero, which yields the minimum-norm least-squares solution for rank-deficient input.
pub(crate) fn pinv(a: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let (rows, cols) = a.shape();
    let svd = a.clone().svd(true, true);
    let sigma_max = svd.singular_values.max();
    let tol = rows.max(cols) as f64 * f64::EPSILON * sigma_max;
    svd.pseudo_inverse(tol)
        .map_err(|e| Error::InvalidData(format!("pseudoinverse failed: {e}")))
}

/// Solve `m * x = rhs` for symmetric positive-definite `m`.
pub(crate) fn solve_spd(m: DMatrix<f64>, rhs: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let n = m.nrows();
    ensure_shape("spd system", (n, n), m.shape())?;
    ensure_shape("spd right-hand side", (n, rhs.ncols()), rhs.shape())?;

    let chol = m.cholesky().ok_or_else(|| {
        Error::SingularMatrix(format!(
            "{n}x{n} system is not positive definite (is gamma > 0?)"
        ))
    })?;
    Ok(chol.solve(rhs))
}
