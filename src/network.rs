use nalgebra::DMatrix;

use crate::layer::{HiddenLayer, InputLayer, Layer, TerminalLayer};
use crate::{Error, Penalties, Result};

/// A chain of dense layers trained by block minimization.
///
/// Invariants (checked by [`Network::from_layers`]):
/// - layer 0 is an input layer, the last layer is terminal, the rest are hidden
/// - `in_dim` of each layer equals `out_dim` of the previous one
/// - all layers hold blocks for the same batch size
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    pub(crate) layers: Vec<Layer>,
    batch_size: usize,
}

impl Network {
    pub fn from_layers(layers: Vec<Layer>) -> Result<Self> {
        if layers.len() < 2 {
            return Err(Error::InvalidConfig(
                "network needs at least an input and a terminal layer".to_owned(),
            ));
        }
        let last = layers.len() - 1;
        for (idx, layer) in layers.iter().enumerate() {
            let ok = match layer {
                Layer::Input(_) => idx == 0,
                Layer::Hidden(_) => idx != 0 && idx != last,
                Layer::Terminal(_) => idx == last,
            };
            if !ok {
                return Err(Error::InvalidConfig(format!(
                    "{} layer cannot appear at position {idx} of {}",
                    layer.kind().name(),
                    layers.len()
                )));
            }
            if idx > 0 {
                let prev_out = layers[idx - 1].out_dim();
                if layer.in_dim() != prev_out {
                    return Err(Error::InvalidConfig(format!(
                        "layer {idx} in_dim {} does not match previous out_dim {prev_out}",
                        layer.in_dim()
                    )));
                }
            }
        }

        let batch_size = match &layers[0] {
            Layer::Input(l) => l.a().ncols(),
            _ => unreachable!("position 0 checked above"),
        };
        for (idx, layer) in layers.iter().enumerate() {
            let cols = layer
                .activation()
                .or(layer.output())
                .map(|m| m.ncols())
                .unwrap_or(batch_size);
            if cols != batch_size {
                return Err(Error::InvalidConfig(format!(
                    "layer {idx} holds batch size {cols}, expected {batch_size}"
                )));
            }
        }

        Ok(Self { layers, batch_size })
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.layers[0].out_dim()
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.terminal().out_dim()
    }

    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of layers, including the input layer.
    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn layer(&self, idx: usize) -> Option<&Layer> {
        self.layers.get(idx)
    }

    #[inline]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn input(&self) -> &InputLayer {
        match &self.layers[0] {
            Layer::Input(l) => l,
            _ => unreachable!("layer 0 is always the input layer"),
        }
    }

    pub fn hidden(&self) -> impl Iterator<Item = &HiddenLayer> {
        self.layers.iter().filter_map(|l| match l {
            Layer::Hidden(h) => Some(h),
            _ => None,
        })
    }

    pub fn terminal(&self) -> &TerminalLayer {
        match self.layers.last() {
            Some(Layer::Terminal(l)) => l,
            _ => unreachable!("the last layer is always terminal"),
        }
    }

    /// Penalties for layer `idx`: the layer's own override, else `default`.
    #[inline]
    pub fn penalties_for(&self, idx: usize, default: Penalties) -> Penalties {
        self.layers
            .get(idx)
            .and_then(Layer::penalties)
            .unwrap_or(default)
    }

    /// Forward prediction for a batch of inputs (shape `(input_dim, batch)`).
    ///
    /// Hidden layers apply `h(W a)`; the terminal layer returns raw scores `W a`.
    pub fn predict(&self, input: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let mut a = input.clone();
        for layer in &self.layers[1..] {
            a = match layer {
                Layer::Hidden(h) => h.forward(&a)?,
                Layer::Terminal(t) => t.forward(&a)?,
                Layer::Input(_) => unreachable!("only layer 0 is an input layer"),
            };
        }
        Ok(a)
    }
}
