//! Element-wise output (pre-activation) solvers.
//!
//! Both the hidden-layer penalty `gamma * ||A - h(Z)||^2` and the terminal hinge
//! loss act entry-wise, as does `beta * ||Z - W A_prev||^2`. The `Z` subproblem
//! therefore splits into independent scalar problems, one per matrix entry, each
//! of which has a closed-form minimizer.
//!
//! # Hidden layers (ReLU)
//!
//! For an entry with activation `a` and linear response `m = (W A_prev)[i, j]` we
//! minimize `gamma * (a - relu(z))^2 + beta * (z - m)^2`. With
//! `s = (gamma * a + beta * m) / (gamma + beta)` the minimizer is chosen by sign:
//!
//! | case             | result                              |
//! |------------------|-------------------------------------|
//! | `a <= 0, m <= 0` | `m`                                 |
//! | `a >= 0, m >= 0` | `s`                                 |
//! | `m < 0 < a`      | `s` if `s^2 > a^2`, otherwise `m`   |
//! | `a < 0 < m`      | `s`                                 |
//!
//! Cases are checked top to bottom, so `a = 0, m = 0` yields `m`.
//!
//! # Terminal layer (hinge loss)
//!
//! For a bipolar target `y` (label 1 for `+1`, 0 for `-1`), dual entry `eps` and
//! response `m` we minimize `l(z, label) + z * eps + beta * (z - m)^2` where
//! `l(z, 1) = max(1 - z, 0)` and `l(z, 0) = max(z, 0)`.

use nalgebra::DMatrix;
use tracing::trace;

use crate::error::ensure_shape;
use crate::loss::bipolar_to_label;
use crate::{Nonlinearity, Result, linalg};

/// Result of squaring a value that may leave the finite range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CheckedSquare {
    Finite(f64),
    Overflow,
}

impl CheckedSquare {
    #[inline]
    pub fn of(x: f64) -> Self {
        let sq = x * x;
        if sq.is_finite() {
            CheckedSquare::Finite(sq)
        } else {
            CheckedSquare::Overflow
        }
    }
}

/// Closed-form minimizer of `gamma * (a - relu(z))^2 + beta * (z - m)^2` over `z`.
pub fn minimize_relu_entry(a: f64, m: f64, gamma: f64, beta: f64) -> f64 {
    if a <= 0.0 && m <= 0.0 {
        return m;
    }
    let s = (gamma * a + beta * m) / (gamma + beta);
    if a >= 0.0 && m >= 0.0 {
        return s;
    }
    if m < 0.0 && 0.0 < a {
        return match (CheckedSquare::of(s), CheckedSquare::of(a)) {
            (CheckedSquare::Finite(s2), CheckedSquare::Finite(a2)) if s2 > a2 => s,
            (CheckedSquare::Finite(_), CheckedSquare::Finite(_)) => m,
            _ => {
                trace!(a, m, "square overflowed, keeping negative branch");
                m
            }
        };
    }
    // a < 0 < m
    s
}

/// Closed-form minimizer of `gamma * (a - h(z))^2 + beta * (z - m)^2` for any
/// supported nonlinearity.
#[inline]
pub fn minimize_hidden_entry(h: Nonlinearity, a: f64, m: f64, gamma: f64, beta: f64) -> f64 {
    match h {
        Nonlinearity::ReLU => minimize_relu_entry(a, m, gamma, beta),
        Nonlinearity::Identity => (gamma * a + beta * m) / (gamma + beta),
    }
}

/// Closed-form minimizer of `l(z, label) + z * eps + beta * (z - m)^2` over `z`.
///
/// `label` must be 0 or 1.
pub fn minimize_terminal_entry(label: u8, eps: f64, m: f64, beta: f64) -> f64 {
    let two_beta = 2.0 * beta;
    if label == 0 {
        let threshold = (1.0 + eps) / two_beta;
        if m >= threshold {
            m - threshold
        } else {
            m - eps / two_beta
        }
    } else {
        let s = m + (1.0 - eps) / two_beta;
        if s <= 1.0 { s } else { m - eps / two_beta }
    }
}

/// Hidden-layer output fit with a ReLU coupling.
///
/// Shape contract:
/// - `a`: `(n_out, batch)`
/// - `w`: `(n_out, n_in)`
/// - `a_prev`: `(n_in, batch)`
/// - returns `(n_out, batch)`
pub fn fit_output_hidden(
    a: &DMatrix<f64>,
    w: &DMatrix<f64>,
    a_prev: &DMatrix<f64>,
    gamma: f64,
    beta: f64,
) -> Result<DMatrix<f64>> {
    fit_output_hidden_with(Nonlinearity::ReLU, a, w, a_prev, gamma, beta)
}

/// Hidden-layer output fit for an arbitrary [`Nonlinearity`].
pub fn fit_output_hidden_with(
    h: Nonlinearity,
    a: &DMatrix<f64>,
    w: &DMatrix<f64>,
    a_prev: &DMatrix<f64>,
    gamma: f64,
    beta: f64,
) -> Result<DMatrix<f64>> {
    let m = linalg::project(w, a_prev)?;
    ensure_shape("hidden activation", m.shape(), a.shape())?;

    Ok(a.zip_map(&m, |a_ij, m_ij| {
        minimize_hidden_entry(h, a_ij, m_ij, gamma, beta)
    }))
}

/// Terminal-layer output fit against bipolar targets.
///
/// Shape contract:
/// - `y`, `eps`: `(n_out, batch)`, `y` entries in `{-1, +1}`
/// - `w`: `(n_out, n_in)`
/// - `a_prev`: `(n_in, batch)`
/// - returns `(n_out, batch)`
pub fn fit_output_terminal(
    y: &DMatrix<f64>,
    eps: &DMatrix<f64>,
    w: &DMatrix<f64>,
    a_prev: &DMatrix<f64>,
    beta: f64,
) -> Result<DMatrix<f64>> {
    let m = linalg::project(w, a_prev)?;
    ensure_shape("target", m.shape(), y.shape())?;
    ensure_shape("dual variable", m.shape(), eps.shape())?;

    let mut z = DMatrix::zeros(m.nrows(), m.ncols());
    for j in 0..m.ncols() {
        for i in 0..m.nrows() {
            let label = bipolar_to_label(y[(i, j)])?;
            z[(i, j)] = minimize_terminal_entry(label, eps[(i, j)], m[(i, j)], beta);
        }
    }
    Ok(z)
}
