//! Contiguous dataset helpers and synthetic data sources.
//!
//! `Dataset` stores paired input/target samples contiguously. Samples are
//! presented to the network as columns: one `(dim, 1)` matrix per sample, or a
//! `(dim, width)` block of consecutive samples.

use nalgebra::DMatrix;
use rand::Rng;
use rand::seq::SliceRandom;
use rand_distr::{Distribution, Gamma};

use crate::loss::bipolar_to_label;
use crate::{Error, Result};

/// A supervised dataset: inputs (X) and bipolar targets (Y).
///
/// Stored as contiguous buffers, one sample after another:
/// - `inputs.len() == len * input_dim`
/// - `targets.len() == len * target_dim`
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    inputs: Vec<f64>,
    targets: Vec<f64>,
    len: usize,
    input_dim: usize,
    target_dim: usize,
}

impl Dataset {
    /// Build a dataset from flat buffers.
    ///
    /// `inputs` is `(len, input_dim)` and `targets` is `(len, target_dim)`. Every
    /// target entry must be `-1` or `+1`.
    pub fn from_flat(
        inputs: Vec<f64>,
        targets: Vec<f64>,
        input_dim: usize,
        target_dim: usize,
    ) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::InvalidData("input_dim must be > 0".to_owned()));
        }
        if target_dim == 0 {
            return Err(Error::InvalidData("target_dim must be > 0".to_owned()));
        }
        if !inputs.len().is_multiple_of(input_dim) {
            return Err(Error::InvalidData(format!(
                "inputs length {} is not divisible by input_dim {}",
                inputs.len(),
                input_dim
            )));
        }

        let len = inputs.len() / input_dim;
        if targets.len() != len * target_dim {
            return Err(Error::InvalidData(format!(
                "targets length {} does not match len * target_dim ({} * {})",
                targets.len(),
                len,
                target_dim
            )));
        }
        if inputs.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidData(
                "inputs must contain only finite values".to_owned(),
            ));
        }
        for &t in &targets {
            bipolar_to_label(t)?;
        }

        Ok(Self {
            inputs,
            targets,
            len,
            input_dim,
            target_dim,
        })
    }

    /// Build a dataset from per-sample rows.
    ///
    /// This is a convenience constructor (it copies into contiguous storage).
    pub fn from_rows(inputs: &[Vec<f64>], targets: &[Vec<f64>]) -> Result<Self> {
        if inputs.len() != targets.len() {
            return Err(Error::InvalidData(format!(
                "inputs/targets length mismatch: {} vs {}",
                inputs.len(),
                targets.len()
            )));
        }
        if inputs.is_empty() {
            return Err(Error::InvalidData("inputs must not be empty".to_owned()));
        }

        let input_dim = inputs[0].len();
        let target_dim = targets[0].len();
        for (i, row) in inputs.iter().enumerate() {
            if row.len() != input_dim {
                return Err(Error::InvalidData(format!(
                    "input row {i} has len {}, expected {input_dim}",
                    row.len()
                )));
            }
        }
        for (i, row) in targets.iter().enumerate() {
            if row.len() != target_dim {
                return Err(Error::InvalidData(format!(
                    "target row {i} has len {}, expected {target_dim}",
                    row.len()
                )));
            }
        }

        Self::from_flat(inputs.concat(), targets.concat(), input_dim, target_dim)
    }

    /// Random classification data in the style of the reference experiment:
    /// `log10(Gamma(5, 1))` features and one-vs-all bipolar targets.
    pub fn synthetic<R: Rng + ?Sized>(
        input_dim: usize,
        target_dim: usize,
        len: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let inputs = sample_gen(input_dim, len, rng)?;
        let targets = target_gen(target_dim, len, rng)?;
        Self::from_rows(&inputs, &targets)
    }

    #[inline]
    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    /// Returns true if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[inline]
    pub fn target_dim(&self) -> usize {
        self.target_dim
    }

    #[inline]
    /// Returns the `idx`-th input (shape: `(input_dim,)`).
    ///
    /// Panics if `idx >= len`.
    pub fn input(&self, idx: usize) -> &[f64] {
        let start = idx * self.input_dim;
        &self.inputs[start..start + self.input_dim]
    }

    #[inline]
    /// Returns the `idx`-th target (shape: `(target_dim,)`).
    ///
    /// Panics if `idx >= len`.
    pub fn target(&self, idx: usize) -> &[f64] {
        let start = idx * self.target_dim;
        &self.targets[start..start + self.target_dim]
    }

    /// The `idx`-th input as an `(input_dim, 1)` column.
    pub fn input_matrix(&self, idx: usize) -> DMatrix<f64> {
        DMatrix::from_column_slice(self.input_dim, 1, self.input(idx))
    }

    /// The `idx`-th target as a `(target_dim, 1)` column.
    pub fn target_matrix(&self, idx: usize) -> DMatrix<f64> {
        DMatrix::from_column_slice(self.target_dim, 1, self.target(idx))
    }

    /// Samples `start..start + width` as an `(input_dim, width)` block, one
    /// column per sample.
    ///
    /// Panics if `start + width > len`.
    pub fn input_block(&self, start: usize, width: usize) -> DMatrix<f64> {
        let from = start * self.input_dim;
        let to = (start + width) * self.input_dim;
        DMatrix::from_column_slice(self.input_dim, width, &self.inputs[from..to])
    }

    /// Targets `start..start + width` as a `(target_dim, width)` block.
    ///
    /// Panics if `start + width > len`.
    pub fn target_block(&self, start: usize, width: usize) -> DMatrix<f64> {
        let from = start * self.target_dim;
        let to = (start + width) * self.target_dim;
        DMatrix::from_column_slice(self.target_dim, width, &self.targets[from..to])
    }
}

/// `n` feature vectors of length `dim`, each entry `log10(x)` with `x ~ Gamma(5, 1)`.
pub fn sample_gen<R: Rng + ?Sized>(dim: usize, n: usize, rng: &mut R) -> Result<Vec<Vec<f64>>> {
    let gamma = Gamma::new(5.0, 1.0)
        .map_err(|e| Error::InvalidConfig(format!("gamma distribution: {e}")))?;
    let mut samples = Vec::with_capacity(n);
    for _ in 0..n {
        let mut s = Vec::with_capacity(dim);
        for _ in 0..dim {
            let x: f64 = gamma.sample(rng);
            s.push(x.log10());
        }
        samples.push(s);
    }
    Ok(samples)
}

/// `n` bipolar one-hot vectors of length `dim`: all `-1` except one `+1` at a
/// uniformly chosen position.
pub fn target_gen<R: Rng + ?Sized>(dim: usize, n: usize, rng: &mut R) -> Result<Vec<Vec<f64>>> {
    if dim == 0 {
        return Err(Error::InvalidConfig("target dim must be > 0".to_owned()));
    }
    let positions: Vec<usize> = (0..dim).collect();
    let mut targets = Vec::with_capacity(n);
    for _ in 0..n {
        let mut t = vec![-1.0; dim];
        if let Some(&hot) = positions.choose(rng) {
            t[hot] = 1.0;
        }
        targets.push(t);
    }
    Ok(targets)
}
