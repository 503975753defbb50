//! Training diagnostics.
//!
//! None of these feed back into the solvers; they report how well the split
//! blocks agree with each other and with the targets.

use nalgebra::DMatrix;

use crate::error::ensure_shape;
use crate::layer::Layer;
use crate::{DualState, Network, Penalties, Result, linalg, loss};

/// Frobenius norm of the consistency gap `Z - W * A_prev`.
pub fn primal_residual(
    z: &DMatrix<f64>,
    w: &DMatrix<f64>,
    a_prev: &DMatrix<f64>,
) -> Result<f64> {
    let m = linalg::project(w, a_prev)?;
    ensure_shape("layer output", m.shape(), z.shape())?;
    Ok((z - m).norm())
}

/// Value of the full split objective at the network's current blocks:
///
/// `hinge(Z_L, Y) + <Z_L, Lambda> + beta ||Z_L - W_L A_{L-1}||^2
///   + sum_l [gamma ||A_l - h(Z_l)||^2 + beta ||Z_l - W_l A_{l-1}||^2]`
pub fn objective(
    net: &Network,
    dual: &DualState,
    target: &DMatrix<f64>,
    default: Penalties,
) -> Result<f64> {
    let layers = net.layers();
    let mut total = 0.0;
    for idx in 1..layers.len() {
        let p = net.penalties_for(idx, default);
        let Some(a_prev) = layers[idx - 1].activation() else {
            return Err(layers[idx - 1].unsupported("feeding an activation forward"));
        };
        match &layers[idx] {
            Layer::Hidden(h) => {
                let coupling = (h.a() - h.nonlinearity().apply_matrix(h.z())).norm_squared();
                let fit = primal_residual(h.z(), h.w(), a_prev)?;
                total += p.gamma * coupling + p.beta * fit * fit;
            }
            Layer::Terminal(t) => {
                ensure_shape("dual variable", t.z().shape(), dual.shape())?;
                let fit = primal_residual(t.z(), t.w(), a_prev)?;
                total += loss::hinge_sum(t.z(), target)?
                    + t.z().dot(dual.lambda())
                    + p.beta * fit * fit;
            }
            Layer::Input(_) => {}
        }
    }
    Ok(total)
}

/// True if the highest score sits where the one-vs-all target has its `+1`.
pub fn argmax_matches(scores: &[f64], target: &[f64]) -> bool {
    match (argmax(scores), argmax(target)) {
        (Some(p), Some(t)) => p == t,
        _ => false,
    }
}

fn argmax(v: &[f64]) -> Option<usize> {
    v.iter()
        .enumerate()
        .filter(|(_, x)| !x.is_nan())
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NetworkBuilder, Nonlinearity};

    #[test]
    fn residual_is_zero_for_consistent_blocks() {
        let w = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let a = DMatrix::from_column_slice(2, 1, &[1.0, -1.0]);
        let z = &w * &a;
        assert_eq!(primal_residual(&z, &w, &a).unwrap(), 0.0);

        let z_off = &z + DMatrix::from_column_slice(2, 1, &[3.0, 4.0]);
        assert_eq!(primal_residual(&z_off, &w, &a).unwrap(), 5.0);
    }

    #[test]
    fn argmax_picks_hot_class() {
        assert!(argmax_matches(&[0.1, 2.0, -1.0], &[-1.0, 1.0, -1.0]));
        assert!(!argmax_matches(&[3.0, 2.0, -1.0], &[-1.0, 1.0, -1.0]));
        assert!(!argmax_matches(&[], &[]));
    }

    #[test]
    fn objective_is_finite_after_build() {
        let net = NetworkBuilder::new(4)
            .unwrap()
            .add_hidden(3, Nonlinearity::ReLU)
            .unwrap()
            .add_terminal(2)
            .unwrap()
            .build_with_seed(0)
            .unwrap();
        let dual = DualState::zeros(2, 1);
        let y = DMatrix::from_column_slice(2, 1, &[1.0, -1.0]);
        let value = objective(&net, &dual, &y, Penalties::default()).unwrap();
        assert!(value.is_finite());
        assert!(value >= 0.0);
    }
}
