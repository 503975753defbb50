//! Checkpoint serialization/deserialization (feature: `serde`).
//!
//! This module defines a versioned, stable on-disk format for a [`Network`]
//! together with its [`DualState`].
//!
//! Design notes:
//! - We do NOT directly serialize internal `Network`/`Layer` structs, to keep the
//!   file format stable even if internal representation changes.
//! - Matrices are stored as `(rows, cols)` plus a row-major data buffer.
//! - All deserialization validates dimensions, buffer lengths, and that all
//!   values are finite.

use std::path::Path;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::layer::{HiddenLayer, InputLayer, Layer, TerminalLayer};
use crate::{DualState, Error, Network, Nonlinearity, Penalties, Result};

pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

/// A network plus the terminal multiplier, enough to resume training.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub network: Network,
    pub dual: DualState,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SerializedCheckpoint {
    pub format_version: u32,
    pub layers: Vec<SerializedLayer>,
    pub dual: SerializedMatrix,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SerializedMatrix {
    pub rows: usize,
    pub cols: usize,
    /// Row-major `(rows, cols)`.
    pub data: Vec<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SerializedPenalties {
    pub beta: f64,
    pub gamma: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SerializedNonlinearity {
    Relu,
    Identity,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SerializedLayer {
    Input {
        dim: usize,
        batch_size: usize,
    },
    Hidden {
        nonlinearity: SerializedNonlinearity,
        penalties: Option<SerializedPenalties>,
        weights: SerializedMatrix,
        activation: SerializedMatrix,
        output: SerializedMatrix,
    },
    Terminal {
        penalties: Option<SerializedPenalties>,
        weights: SerializedMatrix,
        output: SerializedMatrix,
    },
}

impl From<&DMatrix<f64>> for SerializedMatrix {
    fn from(m: &DMatrix<f64>) -> Self {
        // nalgebra stores column-major; transpose to emit rows in order.
        Self {
            rows: m.nrows(),
            cols: m.ncols(),
            data: m.transpose().as_slice().to_vec(),
        }
    }
}

impl SerializedMatrix {
    fn into_matrix(self, what: &str) -> Result<DMatrix<f64>> {
        let expected = self
            .rows
            .checked_mul(self.cols)
            .ok_or_else(|| Error::InvalidData(format!("{what} shape overflow")))?;
        if self.data.len() != expected {
            return Err(Error::InvalidData(format!(
                "{what} data length {} does not match rows * cols ({} * {})",
                self.data.len(),
                self.rows,
                self.cols
            )));
        }
        if self.data.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidData(format!(
                "{what} must contain only finite values"
            )));
        }
        Ok(DMatrix::from_row_slice(self.rows, self.cols, &self.data))
    }
}

impl From<Penalties> for SerializedPenalties {
    fn from(p: Penalties) -> Self {
        Self {
            beta: p.beta,
            gamma: p.gamma,
        }
    }
}

impl From<Nonlinearity> for SerializedNonlinearity {
    fn from(value: Nonlinearity) -> Self {
        match value {
            Nonlinearity::ReLU => SerializedNonlinearity::Relu,
            Nonlinearity::Identity => SerializedNonlinearity::Identity,
        }
    }
}

impl SerializedNonlinearity {
    fn into_nonlinearity(self) -> Nonlinearity {
        match self {
            SerializedNonlinearity::Relu => Nonlinearity::ReLU,
            SerializedNonlinearity::Identity => Nonlinearity::Identity,
        }
    }
}

fn restore_penalties(p: Option<SerializedPenalties>) -> Result<Option<Penalties>> {
    p.map(|p| Penalties::new(p.beta, p.gamma)).transpose()
}

impl From<&Layer> for SerializedLayer {
    fn from(layer: &Layer) -> Self {
        match layer {
            Layer::Input(l) => SerializedLayer::Input {
                dim: l.dim(),
                batch_size: l.a().ncols(),
            },
            Layer::Hidden(l) => SerializedLayer::Hidden {
                nonlinearity: l.nonlinearity().into(),
                penalties: l.penalties().map(Into::into),
                weights: l.w().into(),
                activation: l.a().into(),
                output: l.z().into(),
            },
            Layer::Terminal(l) => SerializedLayer::Terminal {
                penalties: l.penalties().map(Into::into),
                weights: l.w().into(),
                output: l.z().into(),
            },
        }
    }
}

impl SerializedLayer {
    fn into_layer(self) -> Result<Layer> {
        match self {
            SerializedLayer::Input { dim, batch_size } => {
                if dim == 0 || batch_size == 0 {
                    return Err(Error::InvalidData(format!(
                        "input layer dims must be > 0, got dim={dim} batch_size={batch_size}"
                    )));
                }
                Ok(Layer::Input(InputLayer::new(dim, batch_size)))
            }
            SerializedLayer::Hidden {
                nonlinearity,
                penalties,
                weights,
                activation,
                output,
            } => {
                let mut layer = HiddenLayer::from_parts(
                    nonlinearity.into_nonlinearity(),
                    weights.into_matrix("weights")?,
                    activation.into_matrix("activation")?,
                    output.into_matrix("output")?,
                )?;
                if let Some(p) = restore_penalties(penalties)? {
                    layer = layer.with_penalties(p)?;
                }
                Ok(Layer::Hidden(layer))
            }
            SerializedLayer::Terminal {
                penalties,
                weights,
                output,
            } => {
                let mut layer = TerminalLayer::from_parts(
                    weights.into_matrix("weights")?,
                    output.into_matrix("output")?,
                )?;
                if let Some(p) = restore_penalties(penalties)? {
                    layer = layer.with_penalties(p)?;
                }
                Ok(Layer::Terminal(layer))
            }
        }
    }
}

impl From<&Checkpoint> for SerializedCheckpoint {
    fn from(ckpt: &Checkpoint) -> Self {
        Self {
            format_version: CHECKPOINT_FORMAT_VERSION,
            layers: ckpt.network.layers().iter().map(Into::into).collect(),
            dual: ckpt.dual.lambda().into(),
        }
    }
}

impl TryFrom<SerializedCheckpoint> for Checkpoint {
    type Error = Error;

    fn try_from(value: SerializedCheckpoint) -> std::result::Result<Self, Self::Error> {
        if value.format_version != CHECKPOINT_FORMAT_VERSION {
            return Err(Error::InvalidData(format!(
                "unsupported checkpoint format_version {}; expected {}",
                value.format_version, CHECKPOINT_FORMAT_VERSION
            )));
        }

        let mut layers = Vec::with_capacity(value.layers.len());
        for (i, layer) in value.layers.into_iter().enumerate() {
            let l = layer
                .into_layer()
                .map_err(|e| Error::InvalidData(format!("layer {i} invalid: {e}")))?;
            layers.push(l);
        }
        // Network::from_layers checks ordering, adjacency and batch size.
        let network = Network::from_layers(layers)
            .map_err(|e| Error::InvalidData(format!("invalid network: {e}")))?;

        let lambda = value.dual.into_matrix("dual")?;
        let expected = (network.output_dim(), network.batch_size());
        if lambda.shape() != expected {
            return Err(Error::InvalidData(format!(
                "dual shape {:?} does not match (output_dim, batch_size) {:?}",
                lambda.shape(),
                expected
            )));
        }

        Ok(Checkpoint {
            network,
            dual: DualState::from_matrix(lambda),
        })
    }
}

impl Checkpoint {
    /// Serialize to a pretty-printed JSON string.
    pub fn to_json_string_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&SerializedCheckpoint::from(self))?)
    }

    /// Serialize to a compact JSON string.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&SerializedCheckpoint::from(self))?)
    }

    /// Parse a checkpoint from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let ser: SerializedCheckpoint = serde_json::from_str(s)?;
        ser.try_into()
    }

    /// Save to a JSON file (pretty-printed).
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let s = self.to_json_string_pretty()?;
        std::fs::write(path, s)?;
        Ok(())
    }

    /// Load from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json_str(&s)
    }
}
