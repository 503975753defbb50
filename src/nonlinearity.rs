//! Nonlinearities coupling a hidden layer's output `z` to its activation `a`.
//!
//! In the split formulation a hidden layer never computes `a = h(z)` directly.
//! Instead the penalty `gamma * ||a - h(z)||^2` ties the two blocks together, and
//! the output solver needs to know the piecewise structure of `h` to minimize it
//! in closed form (see [`crate::output`]).

use nalgebra::DMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Element-wise nonlinearity of a hidden layer.
pub enum Nonlinearity {
    /// `h(x) = max(x, 0)`.
    #[default]
    ReLU,
    /// `h(x) = x`. Turns the hidden layer into a linear block.
    Identity,
}

impl Nonlinearity {
    #[inline]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Nonlinearity::ReLU => x.max(0.0),
            Nonlinearity::Identity => x,
        }
    }

    /// Apply `h` to every entry of `z`.
    pub fn apply_matrix(self, z: &DMatrix<f64>) -> DMatrix<f64> {
        z.map(|x| self.apply(x))
    }

    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Nonlinearity::ReLU => "relu",
            Nonlinearity::Identity => "identity",
        }
    }
}
