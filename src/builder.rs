//! Network builder.
//!
//! `NetworkBuilder` is the recommended way to define a network. It makes the
//! chain explicit (input size, hidden sizes with their nonlinearities, terminal
//! size) and randomly initializes every block:
//!
//! - hidden activations: `|N(0, 1)|`
//! - hidden and terminal outputs and weights: `N(0, 1)`
//! - input activation: zeros until the first example is assigned

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::layer::{HiddenLayer, InputLayer, Layer, TerminalLayer};
use crate::{Error, Network, Nonlinearity, Penalties, Result};

#[derive(Debug, Clone, Copy)]
struct HiddenPlan {
    out_dim: usize,
    nonlinearity: Nonlinearity,
    penalties: Option<Penalties>,
}

#[derive(Debug, Clone, Copy)]
struct TerminalPlan {
    out_dim: usize,
    penalties: Option<Penalties>,
}

#[derive(Debug, Clone)]
/// Builder for a [`Network`].
///
/// Example:
///
/// ```rust
/// use admm_mlp::{NetworkBuilder, Nonlinearity};
///
/// # fn main() -> admm_mlp::Result<()> {
/// let net = NetworkBuilder::new(200)?
///     .add_hidden(50, Nonlinearity::ReLU)?
///     .add_terminal(10)?
///     .build_with_seed(0)?;
/// assert_eq!(net.num_layers(), 3);
/// # Ok(())
/// # }
/// ```
pub struct NetworkBuilder {
    input_dim: usize,
    batch_size: usize,
    hidden: Vec<HiddenPlan>,
    terminal: Option<TerminalPlan>,
}

impl NetworkBuilder {
    /// Start building a network that accepts inputs of length `input_dim`.
    pub fn new(input_dim: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::InvalidConfig("input_dim must be > 0".to_owned()));
        }
        Ok(Self {
            input_dim,
            batch_size: 1,
            hidden: Vec::new(),
            terminal: None,
        })
    }

    /// Number of columns held by every block (default 1).
    pub fn batch_size(mut self, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".to_owned()));
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    /// Add a hidden layer with `out_dim` units.
    pub fn add_hidden(mut self, out_dim: usize, nonlinearity: Nonlinearity) -> Result<Self> {
        if out_dim == 0 {
            return Err(Error::InvalidConfig("layer out_dim must be > 0".to_owned()));
        }
        if self.terminal.is_some() {
            return Err(Error::InvalidConfig(
                "hidden layers must be added before the terminal layer".to_owned(),
            ));
        }
        self.hidden.push(HiddenPlan {
            out_dim,
            nonlinearity,
            penalties: None,
        });
        Ok(self)
    }

    /// Add the terminal layer with `out_dim` outputs (one per class).
    pub fn add_terminal(mut self, out_dim: usize) -> Result<Self> {
        if out_dim == 0 {
            return Err(Error::InvalidConfig("layer out_dim must be > 0".to_owned()));
        }
        if self.terminal.is_some() {
            return Err(Error::InvalidConfig(
                "terminal layer already added".to_owned(),
            ));
        }
        self.terminal = Some(TerminalPlan {
            out_dim,
            penalties: None,
        });
        Ok(self)
    }

    /// Override the penalties of the most recently added layer.
    pub fn with_penalties(mut self, penalties: Penalties) -> Result<Self> {
        penalties.validate()?;
        if let Some(t) = self.terminal.as_mut() {
            t.penalties = Some(penalties);
        } else if let Some(h) = self.hidden.last_mut() {
            h.penalties = Some(penalties);
        } else {
            return Err(Error::InvalidConfig(
                "with_penalties needs a layer to apply to".to_owned(),
            ));
        }
        Ok(self)
    }

    /// Build using a deterministic seed.
    pub fn build_with_seed(self, seed: u64) -> Result<Network> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_with_rng(&mut rng)
    }

    /// Build using the provided RNG.
    pub fn build_with_rng<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Network> {
        let Some(terminal) = self.terminal else {
            return Err(Error::InvalidConfig(
                "network must end with a terminal layer".to_owned(),
            ));
        };

        let batch = self.batch_size;
        let mut layers = Vec::with_capacity(self.hidden.len() + 2);
        layers.push(Layer::Input(InputLayer::new(self.input_dim, batch)));

        let mut in_dim = self.input_dim;
        for plan in self.hidden {
            let mut layer =
                HiddenLayer::new_with_rng(in_dim, plan.out_dim, batch, plan.nonlinearity, rng);
            if let Some(p) = plan.penalties {
                layer = layer.with_penalties(p)?;
            }
            layers.push(Layer::Hidden(layer));
            in_dim = plan.out_dim;
        }

        let mut last = TerminalLayer::new_with_rng(in_dim, terminal.out_dim, batch, rng);
        if let Some(p) = terminal.penalties {
            last = last.with_penalties(p)?;
        }
        layers.push(Layer::Terminal(last));

        Network::from_layers(layers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_reference_topology() {
        let net = NetworkBuilder::new(200)
            .unwrap()
            .add_hidden(50, Nonlinearity::ReLU)
            .unwrap()
            .add_terminal(10)
            .unwrap()
            .build_with_seed(0)
            .unwrap();
        assert_eq!(net.input_dim(), 200);
        assert_eq!(net.output_dim(), 10);
        assert_eq!(net.num_layers(), 3);
        assert_eq!(net.terminal().w().shape(), (10, 50));
    }

    #[test]
    fn seeded_init_is_deterministic() {
        let build = || {
            NetworkBuilder::new(3)
                .unwrap()
                .add_hidden(4, Nonlinearity::ReLU)
                .unwrap()
                .add_terminal(2)
                .unwrap()
                .build_with_seed(42)
                .unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn rejects_bad_structure() {
        assert!(NetworkBuilder::new(0).is_err());
        assert!(
            NetworkBuilder::new(3)
                .unwrap()
                .add_hidden(2, Nonlinearity::ReLU)
                .unwrap()
                .build_with_seed(0)
                .is_err()
        );
        assert!(
            NetworkBuilder::new(3)
                .unwrap()
                .add_terminal(2)
                .unwrap()
                .add_hidden(2, Nonlinearity::ReLU)
                .is_err()
        );
        assert!(NetworkBuilder::new(3).unwrap().with_penalties(Penalties::default()).is_err());
    }

    #[test]
    fn penalties_attach_to_last_layer() {
        let p = Penalties::new(0.5, 3.0).unwrap();
        let net = NetworkBuilder::new(3)
            .unwrap()
            .add_hidden(4, Nonlinearity::ReLU)
            .unwrap()
            .with_penalties(p)
            .unwrap()
            .add_terminal(2)
            .unwrap()
            .build_with_seed(0)
            .unwrap();
        assert_eq!(net.hidden().next().unwrap().penalties(), Some(p));
        assert_eq!(net.terminal().penalties(), None);
    }

    #[test]
    fn batch_size_sets_block_columns() {
        let net = NetworkBuilder::new(3)
            .unwrap()
            .batch_size(5)
            .unwrap()
            .add_terminal(2)
            .unwrap()
            .build_with_seed(0)
            .unwrap();
        assert_eq!(net.batch_size(), 5);
        assert_eq!(net.terminal().z().shape(), (2, 5));
        assert_eq!(net.input().a().shape(), (3, 5));
    }
}
