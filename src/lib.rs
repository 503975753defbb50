//! Gradient-free training of dense feed-forward networks.
//!
//! `admm-mlp` trains a chain of fully-connected layers without backpropagation.
//! Training is split into blocks: each layer's weights `W_l`, pre-activation
//! output `Z_l` and activation `A_l` are separate variables of one objective,
//! tied together by quadratic penalties and, at the terminal layer, by a dual
//! variable `Lambda`:
//!
//! ```text
//! hinge(Z_L, Y) + <Z_L, Lambda> + beta ||Z_L - W_L A_{L-1}||^2
//!   + sum_{l < L} [ gamma ||A_l - h(Z_l)||^2 + beta ||Z_l - W_l A_{l-1}||^2 ]
//! ```
//!
//! Every block has a closed-form minimizer with the others held fixed. A sweep
//! visits the layers in order and solves each block once.
//!
//! # Solvers
//!
//! - [`fit_weight`]: least squares via the pseudoinverse
//! - [`fit_activation`]: ridge regression against the next layer
//! - [`fit_output_hidden`]: piecewise closed form for ReLU coupling
//! - [`fit_output_terminal`]: closed form for the hinge loss
//! - [`update_dual`]: dual ascent increment
//!
//! # Data layout and shapes
//!
//! - Scalars are `f64`; blocks are `nalgebra::DMatrix<f64>`.
//! - The batch dimension is the number of columns.
//! - Weights have shape `(out_dim, in_dim)`; activations and outputs
//!   `(out_dim, batch)`.
//! - Shape errors are reported as [`Error::ShapeMismatch`], never reshaped.
//!
//! # Quick start
//!
//! ```rust
//! use admm_mlp::{Dataset, DualState, FitConfig, NetworkBuilder, Nonlinearity};
//! use rand::SeedableRng;
//!
//! # fn main() -> admm_mlp::Result<()> {
//! let mut rng = rand::rngs::StdRng::seed_from_u64(0);
//! let train = Dataset::synthetic(20, 4, 8, &mut rng)?;
//!
//! let mut net = NetworkBuilder::new(20)?
//!     .add_hidden(10, Nonlinearity::ReLU)?
//!     .add_terminal(4)?
//!     .build_with_seed(0)?;
//!
//! let mut dual = DualState::zeros(net.output_dim(), net.batch_size());
//! let report = net.fit(&train, FitConfig::default(), &mut dual)?;
//! assert_eq!(report.examples.len(), 8);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod coordinator;
pub mod data;
pub mod dual;
pub mod error;
pub mod layer;
pub(crate) mod linalg;
pub mod loss;
pub mod metrics;
pub mod network;
pub mod nonlinearity;
pub mod output;
pub mod solve;
pub mod train;

#[cfg(feature = "serde")]
pub mod serde_model;

pub use builder::NetworkBuilder;
pub use coordinator::SweepReport;
pub use data::{Dataset, sample_gen, target_gen};
pub use dual::DualState;
pub use error::{Error, Result};
pub use layer::{Capabilities, HiddenLayer, InputLayer, Layer, LayerKind, Phase, TerminalLayer};
pub use network::Network;
pub use nonlinearity::Nonlinearity;
pub use output::{CheckedSquare, fit_output_hidden, fit_output_hidden_with, fit_output_terminal};
pub use solve::{fit_activation, fit_weight, update_dual};
pub use train::{ExampleReport, FitConfig, FitReport, Penalties, SweepSchedule};

#[cfg(feature = "serde")]
pub use serde_model::Checkpoint;
