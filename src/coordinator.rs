//! The per-example sweep over the layer chain.
//!
//! A sweep assigns the input, then walks the chain and runs every block solver
//! a layer's [`Capabilities`](crate::layer::Capabilities) allow:
//!
//! - hidden: weight fit, activation fit (reads layer `l + 1`), output fit
//! - terminal: weight fit, output fit (reads `Lambda`), dual update
//!
//! The order of those steps across layers is set by [`SweepSchedule`].

use nalgebra::DMatrix;
use tracing::debug;

use crate::error::ensure_shape;
use crate::layer::Layer;
use crate::{DualState, FitConfig, Network, Penalties, Result, SweepSchedule, metrics};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepReport {
    /// `||Z_L - W_L A_{L-1}||_F` after the dual update.
    pub residual: f64,
}

impl Network {
    /// Run one sweep for a batch of examples.
    ///
    /// Shape contract:
    /// - `input`: `(input_dim, batch_size)`
    /// - `target`: `(output_dim, batch_size)`, bipolar entries
    /// - `dual`: `(output_dim, batch_size)`
    ///
    /// Input, target and dual shapes are checked before any layer is touched.
    /// A later solver error aborts the sweep; layers solved before the failing
    /// step keep their updated blocks.
    pub fn sweep(
        &mut self,
        input: &DMatrix<f64>,
        target: &DMatrix<f64>,
        dual: &mut DualState,
        cfg: &FitConfig,
    ) -> Result<SweepReport> {
        let batch = self.batch_size();
        ensure_shape("input", (self.input_dim(), batch), input.shape())?;
        ensure_shape("target", (self.output_dim(), batch), target.shape())?;
        ensure_shape("dual variable", (self.output_dim(), batch), dual.shape())?;

        match &mut self.layers[0] {
            Layer::Input(l) => l.assign(input)?,
            _ => unreachable!("layer 0 is always the input layer"),
        }

        let n = self.layers.len();
        match cfg.schedule {
            SweepSchedule::Lagged => {
                for idx in 1..n {
                    self.weight_step(idx)?;
                    self.remaining_steps(idx, target, dual, cfg.penalties)?;
                }
            }
            SweepSchedule::Synchronous => {
                for idx in 1..n {
                    self.weight_step(idx)?;
                }
                for idx in 1..n {
                    self.remaining_steps(idx, target, dual, cfg.penalties)?;
                }
            }
        }

        let a_prev = self.activation_of(n - 2)?;
        let t = self.terminal();
        let residual = metrics::primal_residual(t.z(), t.w(), a_prev)?;
        debug!(residual, "sweep complete");
        Ok(SweepReport { residual })
    }

    fn activation_of(&self, idx: usize) -> Result<&DMatrix<f64>> {
        let layer = &self.layers[idx];
        layer
            .activation()
            .ok_or_else(|| layer.unsupported("feeding an activation forward"))
    }

    fn weight_step(&mut self, idx: usize) -> Result<()> {
        if !self.layers[idx].capabilities().weight_fit {
            return Ok(());
        }
        let (left, right) = self.layers.split_at_mut(idx);
        let a_prev = left[idx - 1]
            .activation()
            .ok_or_else(|| left[idx - 1].unsupported("feeding an activation forward"))?;
        right[0].fit_weight(a_prev)?;
        debug!(layer = idx, "weights updated");
        Ok(())
    }

    /// Activation fit, output fit and dual update for layer `idx`, as supported.
    ///
    /// Each penalty is taken from the layer that owns the coupling term: the
    /// activation fit weights `||Z_{l+1} - W_{l+1} A_l||^2` by layer `l + 1`'s
    /// `beta` and `||A_l - h(Z_l)||^2` by layer `l`'s `gamma`.
    fn remaining_steps(
        &mut self,
        idx: usize,
        target: &DMatrix<f64>,
        dual: &mut DualState,
        defaults: Penalties,
    ) -> Result<()> {
        let caps = self.layers[idx].capabilities();
        let p = self.penalties_for(idx, defaults);

        if caps.activation_fit {
            let beta_next = self.penalties_for(idx + 1, defaults).beta;
            let (left, right) = self.layers.split_at_mut(idx + 1);
            let next = &right[0];
            let (Some(w_next), Some(z_next)) = (next.weights(), next.output()) else {
                return Err(next.unsupported("feeding weights back"));
            };
            if let Layer::Hidden(h) = &mut left[idx] {
                h.fit_activation(w_next, z_next, beta_next, p.gamma)?;
            }
            debug!(layer = idx, beta_next, "activation updated");
        }

        let (left, right) = self.layers.split_at_mut(idx);
        let prev = &left[idx - 1];
        let a_prev = prev
            .activation()
            .ok_or_else(|| prev.unsupported("feeding an activation forward"))?;

        if caps.output_fit {
            match &mut right[0] {
                Layer::Hidden(h) => h.fit_output(a_prev, p)?,
                Layer::Terminal(t) => t.fit_output(target, dual, a_prev, p.beta)?,
                Layer::Input(_) => unreachable!("input layers have no output fit"),
            }
            debug!(layer = idx, "output updated");
        }

        if caps.dual_update {
            if let Layer::Terminal(t) = &mut right[0] {
                t.update_dual(dual, a_prev, p.beta)?;
            }
            debug!(layer = idx, "dual updated");
        }

        Ok(())
    }
}
