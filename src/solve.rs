//! Closed-form block solvers for weights, activations and the dual variable.
//!
//! Each function minimizes one block of the split objective with every other
//! block held fixed. Shapes are validated at the boundary and reported as
//! [`Error::ShapeMismatch`](crate::Error::ShapeMismatch).

use nalgebra::DMatrix;
use tracing::trace;

use crate::error::ensure_shape;
use crate::linalg;
use crate::{Error, Result};

/// Least-squares weight fit: `W = Z * pinv(A_prev)`.
///
/// Minimizes `||Z - W * A_prev||^2`. When `A_prev` has full row rank the result
/// satisfies the normal equation `W * A_prev * A_prev^T = Z * A_prev^T`; otherwise
/// it is the minimum-norm minimizer.
///
/// Shape contract:
/// - `z`: `(n_out, batch)`
/// - `a_prev`: `(n_in, batch)`
/// - returns `(n_out, n_in)`
pub fn fit_weight(z: &DMatrix<f64>, a_prev: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    ensure_shape(
        "previous activation",
        (a_prev.nrows(), z.ncols()),
        a_prev.shape(),
    )?;

    let w = z * linalg::pinv(a_prev)?;
    trace!(rows = w.nrows(), cols = w.ncols(), "weight fit");
    Ok(w)
}

/// Ridge-regression activation fit for a hidden layer.
///
/// Minimizes `beta * ||Z_next - W_next * A||^2 + gamma * ||A - H_self||^2`:
///
/// `A = (beta * W_next^T W_next + gamma * I)^-1 (beta * W_next^T Z_next + gamma * H_self)`
///
/// The system matrix is symmetric positive definite whenever `gamma > 0`, so it is
/// solved by Cholesky factorization. A failed factorization is reported as
/// [`Error::SingularMatrix`].
///
/// Shape contract:
/// - `w_next`: `(n_next, n_out)`
/// - `z_next`: `(n_next, batch)`
/// - `h_self`: `(n_out, batch)`, the nonlinearity applied to this layer's `Z`
/// - returns `(n_out, batch)`
pub fn fit_activation(
    w_next: &DMatrix<f64>,
    z_next: &DMatrix<f64>,
    h_self: &DMatrix<f64>,
    beta: f64,
    gamma: f64,
) -> Result<DMatrix<f64>> {
    let (n_next, n_out) = w_next.shape();
    let batch = h_self.ncols();
    ensure_shape("next layer output", (n_next, batch), z_next.shape())?;
    ensure_shape("nonlinear output", (n_out, batch), h_self.shape())?;

    let wt = w_next.transpose();
    let mut system = (&wt * w_next) * beta;
    for i in 0..n_out {
        system[(i, i)] += gamma;
    }
    let rhs = (&wt * z_next) * beta + h_self * gamma;

    linalg::solve_spd(system, &rhs)
}

/// Dual-ascent increment for the terminal layer: `beta * (Z - W * A_prev)`.
///
/// Returns only the delta; accumulate it into the running multiplier with
/// [`DualState::accumulate`](crate::DualState::accumulate).
pub fn update_dual(
    z: &DMatrix<f64>,
    w: &DMatrix<f64>,
    a_prev: &DMatrix<f64>,
    beta: f64,
) -> Result<DMatrix<f64>> {
    let m = linalg::project(w, a_prev)?;
    ensure_shape("terminal output", m.shape(), z.shape())?;
    Ok((z - m) * beta)
}

/// Validate a penalty parameter.
pub(crate) fn check_penalty(name: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(Error::InvalidConfig(format!(
            "{name} must be finite and > 0, got {value}"
        )));
    }
    Ok(())
}
