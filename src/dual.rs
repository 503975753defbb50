//! Dual variable for the terminal layer's consistency constraint.
//!
//! `Lambda` is the only piece of training state that survives from one sweep to
//! the next without being recomputed. It lives outside the layer chain: the
//! caller owns a `DualState` and threads it through every sweep.

use nalgebra::DMatrix;

use crate::error::ensure_shape;
use crate::{Result, solve};

#[derive(Debug, Clone, PartialEq)]
pub struct DualState {
    lambda: DMatrix<f64>,
}

impl DualState {
    /// Zero multiplier with shape `(n_out, batch)`.
    pub fn zeros(n_out: usize, batch: usize) -> Self {
        Self {
            lambda: DMatrix::zeros(n_out, batch),
        }
    }

    /// Resume from a previously saved multiplier.
    pub fn from_matrix(lambda: DMatrix<f64>) -> Self {
        Self { lambda }
    }

    #[inline]
    pub fn lambda(&self) -> &DMatrix<f64> {
        &self.lambda
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.lambda.shape()
    }

    /// Dual ascent: `Lambda += beta * (Z - W * A_prev)`.
    ///
    /// Returns the increment that was applied.
    pub fn step(
        &mut self,
        z: &DMatrix<f64>,
        w: &DMatrix<f64>,
        a_prev: &DMatrix<f64>,
        beta: f64,
    ) -> Result<DMatrix<f64>> {
        let delta = solve::update_dual(z, w, a_prev, beta)?;
        self.accumulate(&delta)?;
        Ok(delta)
    }

    /// Add an increment produced by [`solve::update_dual`].
    pub fn accumulate(&mut self, delta: &DMatrix<f64>) -> Result<()> {
        ensure_shape("dual increment", self.lambda.shape(), delta.shape())?;
        self.lambda += delta;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn second_step_reads_updated_lambda() {
        let w = DMatrix::from_row_slice(1, 2, &[1.0, -1.0]);
        let a_prev = DMatrix::from_column_slice(2, 1, &[3.0, 1.0]);
        let z1 = DMatrix::from_column_slice(1, 1, &[4.0]);
        let z2 = DMatrix::from_column_slice(1, 1, &[1.0]);

        let mut dual = DualState::zeros(1, 1);
        dual.step(&z1, &w, &a_prev, 2.0).unwrap();
        assert_relative_eq!(dual.lambda()[(0, 0)], 4.0);
        dual.step(&z2, &w, &a_prev, 2.0).unwrap();
        // 4 + 2 * (1 - 2)
        assert_relative_eq!(dual.lambda()[(0, 0)], 2.0);
    }

    #[test]
    fn accumulate_rejects_wrong_shape() {
        let mut dual = DualState::zeros(2, 1);
        assert!(dual.accumulate(&DMatrix::zeros(1, 2)).is_err());
        assert_eq!(dual.lambda(), &DMatrix::<f64>::zeros(2, 1));
    }
}
