//! Layers of the split network.
//!
//! A network is a chain `Input -> Hidden* -> Terminal`. Each variant owns its
//! own blocks (`W`, `A`, `Z`) and supports a different subset of the block
//! solvers, described by its [`Capabilities`].

use nalgebra::DMatrix;
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::debug;

use crate::error::ensure_shape;
use crate::{DualState, Error, Nonlinearity, Penalties, Result, output, solve};

/// Where a layer is within the current sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Uninitialized,
    /// Input layer only: activation holds the current example.
    Assigned,
    WeightUpdated,
    /// Hidden layers only.
    ActivationUpdated,
    OutputUpdated,
    /// Terminal layer only.
    DualUpdated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Input,
    Hidden,
    Terminal,
}

/// Which block solvers a layer kind takes part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub weight_fit: bool,
    pub activation_fit: bool,
    pub output_fit: bool,
    pub dual_update: bool,
}

impl LayerKind {
    pub const fn capabilities(self) -> Capabilities {
        match self {
            LayerKind::Input => Capabilities {
                weight_fit: false,
                activation_fit: false,
                output_fit: false,
                dual_update: false,
            },
            LayerKind::Hidden => Capabilities {
                weight_fit: true,
                activation_fit: true,
                output_fit: true,
                dual_update: false,
            },
            LayerKind::Terminal => Capabilities {
                weight_fit: true,
                activation_fit: false,
                output_fit: true,
                dual_update: true,
            },
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            LayerKind::Input => "input",
            LayerKind::Hidden => "hidden",
            LayerKind::Terminal => "terminal",
        }
    }
}

fn standard_normal<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> DMatrix<f64> {
    DMatrix::from_fn(rows, cols, |_, _| rng.sample::<f64, _>(StandardNormal))
}

fn ensure_finite(what: &str, m: &DMatrix<f64>) -> Result<()> {
    if m.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidData(format!(
            "{what} must contain only finite values"
        )));
    }
    Ok(())
}

/// The data layer. Its activation is the current example, assigned directly.
#[derive(Debug, Clone, PartialEq)]
pub struct InputLayer {
    dim: usize,
    a: DMatrix<f64>,
    phase: Phase,
}

impl InputLayer {
    pub fn new(dim: usize, batch: usize) -> Self {
        Self {
            dim,
            a: DMatrix::zeros(dim, batch),
            phase: Phase::Uninitialized,
        }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn a(&self) -> &DMatrix<f64> {
        &self.a
    }

    /// Replace the activation with `input`, which must keep the `(dim, batch)` shape.
    pub fn assign(&mut self, input: &DMatrix<f64>) -> Result<()> {
        ensure_shape("input", self.a.shape(), input.shape())?;
        self.a.clone_from(input);
        self.phase = Phase::Assigned;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HiddenLayer {
    in_dim: usize,
    out_dim: usize,
    nonlinearity: Nonlinearity,
    penalties: Option<Penalties>,
    /// `(out_dim, in_dim)`
    w: DMatrix<f64>,
    /// `(out_dim, batch)`
    a: DMatrix<f64>,
    /// `(out_dim, batch)`
    z: DMatrix<f64>,
    phase: Phase,
}

impl HiddenLayer {
    /// Random initialization: `|N(0, 1)|` activations, `N(0, 1)` outputs and weights.
    pub fn new_with_rng<R: Rng + ?Sized>(
        in_dim: usize,
        out_dim: usize,
        batch: usize,
        nonlinearity: Nonlinearity,
        rng: &mut R,
    ) -> Self {
        let a = standard_normal(out_dim, batch, rng).map(f64::abs);
        let z = standard_normal(out_dim, batch, rng);
        let w = standard_normal(out_dim, in_dim, rng);
        debug!(
            in_dim,
            out_dim,
            nonlinearity = nonlinearity.name(),
            "hidden layer randomly initialized"
        );
        Self {
            in_dim,
            out_dim,
            nonlinearity,
            penalties: None,
            w,
            a,
            z,
            phase: Phase::Uninitialized,
        }
    }

    /// Build from explicit blocks, validating shapes and finiteness.
    pub fn from_parts(
        nonlinearity: Nonlinearity,
        w: DMatrix<f64>,
        a: DMatrix<f64>,
        z: DMatrix<f64>,
    ) -> Result<Self> {
        let (out_dim, in_dim) = w.shape();
        if in_dim == 0 || out_dim == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer dims must be > 0, got in_dim={in_dim} out_dim={out_dim}"
            )));
        }
        ensure_shape("hidden activation", (out_dim, a.ncols()), a.shape())?;
        ensure_shape("hidden output", a.shape(), z.shape())?;
        ensure_finite("weights", &w)?;
        ensure_finite("activation", &a)?;
        ensure_finite("output", &z)?;

        Ok(Self {
            in_dim,
            out_dim,
            nonlinearity,
            penalties: None,
            w,
            a,
            z,
            phase: Phase::Uninitialized,
        })
    }

    pub fn with_penalties(mut self, penalties: Penalties) -> Result<Self> {
        penalties.validate()?;
        self.penalties = Some(penalties);
        Ok(self)
    }

    #[inline]
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    #[inline]
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    #[inline]
    pub fn nonlinearity(&self) -> Nonlinearity {
        self.nonlinearity
    }

    #[inline]
    pub fn penalties(&self) -> Option<Penalties> {
        self.penalties
    }

    #[inline]
    pub fn w(&self) -> &DMatrix<f64> {
        &self.w
    }

    #[inline]
    pub fn a(&self) -> &DMatrix<f64> {
        &self.a
    }

    #[inline]
    pub fn z(&self) -> &DMatrix<f64> {
        &self.z
    }

    pub fn fit_weight(&mut self, a_prev: &DMatrix<f64>) -> Result<()> {
        let w = solve::fit_weight(&self.z, a_prev)?;
        ensure_shape("hidden weights", (self.out_dim, self.in_dim), w.shape())?;
        self.w = w;
        self.phase = Phase::WeightUpdated;
        Ok(())
    }

    /// Activation fit against the next layer's weights and output.
    ///
    /// `beta_next` is the next layer's coupling penalty; `gamma` is this layer's.
    pub fn fit_activation(
        &mut self,
        w_next: &DMatrix<f64>,
        z_next: &DMatrix<f64>,
        beta_next: f64,
        gamma: f64,
    ) -> Result<()> {
        ensure_shape(
            "next layer weights",
            (w_next.nrows(), self.out_dim),
            w_next.shape(),
        )?;
        let h_self = self.nonlinearity.apply_matrix(&self.z);
        let a = solve::fit_activation(w_next, z_next, &h_self, beta_next, gamma)?;
        self.a = a;
        self.phase = Phase::ActivationUpdated;
        Ok(())
    }

    pub fn fit_output(&mut self, a_prev: &DMatrix<f64>, p: Penalties) -> Result<()> {
        let z = output::fit_output_hidden_with(
            self.nonlinearity,
            &self.a,
            &self.w,
            a_prev,
            p.gamma,
            p.beta,
        )?;
        self.z = z;
        self.phase = Phase::OutputUpdated;
        Ok(())
    }

    /// Forward prediction `h(W * a_prev)`.
    pub fn forward(&self, a_prev: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        ensure_shape("layer input", (self.in_dim, a_prev.ncols()), a_prev.shape())?;
        Ok(self.nonlinearity.apply_matrix(&(&self.w * a_prev)))
    }
}

/// The output layer. Its `Z` is fit against the targets under the hinge loss.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalLayer {
    in_dim: usize,
    out_dim: usize,
    penalties: Option<Penalties>,
    w: DMatrix<f64>,
    z: DMatrix<f64>,
    phase: Phase,
}

impl TerminalLayer {
    pub fn new_with_rng<R: Rng + ?Sized>(
        in_dim: usize,
        out_dim: usize,
        batch: usize,
        rng: &mut R,
    ) -> Self {
        let z = standard_normal(out_dim, batch, rng);
        let w = standard_normal(out_dim, in_dim, rng);
        debug!(in_dim, out_dim, "terminal layer randomly initialized");
        Self {
            in_dim,
            out_dim,
            penalties: None,
            w,
            z,
            phase: Phase::Uninitialized,
        }
    }

    pub fn from_parts(w: DMatrix<f64>, z: DMatrix<f64>) -> Result<Self> {
        let (out_dim, in_dim) = w.shape();
        if in_dim == 0 || out_dim == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer dims must be > 0, got in_dim={in_dim} out_dim={out_dim}"
            )));
        }
        ensure_shape("terminal output", (out_dim, z.ncols()), z.shape())?;
        ensure_finite("weights", &w)?;
        ensure_finite("output", &z)?;

        Ok(Self {
            in_dim,
            out_dim,
            penalties: None,
            w,
            z,
            phase: Phase::Uninitialized,
        })
    }

    pub fn with_penalties(mut self, penalties: Penalties) -> Result<Self> {
        penalties.validate()?;
        self.penalties = Some(penalties);
        Ok(self)
    }

    #[inline]
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    #[inline]
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    #[inline]
    pub fn penalties(&self) -> Option<Penalties> {
        self.penalties
    }

    #[inline]
    pub fn w(&self) -> &DMatrix<f64> {
        &self.w
    }

    #[inline]
    pub fn z(&self) -> &DMatrix<f64> {
        &self.z
    }

    pub fn fit_weight(&mut self, a_prev: &DMatrix<f64>) -> Result<()> {
        let w = solve::fit_weight(&self.z, a_prev)?;
        ensure_shape("terminal weights", (self.out_dim, self.in_dim), w.shape())?;
        self.w = w;
        self.phase = Phase::WeightUpdated;
        Ok(())
    }

    pub fn fit_output(
        &mut self,
        target: &DMatrix<f64>,
        dual: &DualState,
        a_prev: &DMatrix<f64>,
        beta: f64,
    ) -> Result<()> {
        let z = output::fit_output_terminal(target, dual.lambda(), &self.w, a_prev, beta)?;
        self.z = z;
        self.phase = Phase::OutputUpdated;
        Ok(())
    }

    pub fn update_dual(
        &mut self,
        dual: &mut DualState,
        a_prev: &DMatrix<f64>,
        beta: f64,
    ) -> Result<()> {
        dual.step(&self.z, &self.w, a_prev, beta)?;
        self.phase = Phase::DualUpdated;
        Ok(())
    }

    /// Forward prediction `W * a_prev` (raw scores).
    pub fn forward(&self, a_prev: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        ensure_shape("layer input", (self.in_dim, a_prev.ncols()), a_prev.shape())?;
        Ok(&self.w * a_prev)
    }
}

/// A layer of the chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Input(InputLayer),
    Hidden(HiddenLayer),
    Terminal(TerminalLayer),
}

impl Layer {
    #[inline]
    pub fn kind(&self) -> LayerKind {
        match self {
            Layer::Input(_) => LayerKind::Input,
            Layer::Hidden(_) => LayerKind::Hidden,
            Layer::Terminal(_) => LayerKind::Terminal,
        }
    }

    #[inline]
    pub fn capabilities(&self) -> Capabilities {
        self.kind().capabilities()
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        match self {
            Layer::Input(l) => l.phase,
            Layer::Hidden(l) => l.phase,
            Layer::Terminal(l) => l.phase,
        }
    }

    #[inline]
    pub fn in_dim(&self) -> usize {
        match self {
            Layer::Input(l) => l.dim,
            Layer::Hidden(l) => l.in_dim,
            Layer::Terminal(l) => l.in_dim,
        }
    }

    #[inline]
    pub fn out_dim(&self) -> usize {
        match self {
            Layer::Input(l) => l.dim,
            Layer::Hidden(l) => l.out_dim,
            Layer::Terminal(l) => l.out_dim,
        }
    }

    /// The activation this layer feeds forward, if it has one.
    pub fn activation(&self) -> Option<&DMatrix<f64>> {
        match self {
            Layer::Input(l) => Some(&l.a),
            Layer::Hidden(l) => Some(&l.a),
            Layer::Terminal(_) => None,
        }
    }

    pub fn weights(&self) -> Option<&DMatrix<f64>> {
        match self {
            Layer::Input(_) => None,
            Layer::Hidden(l) => Some(&l.w),
            Layer::Terminal(l) => Some(&l.w),
        }
    }

    pub fn output(&self) -> Option<&DMatrix<f64>> {
        match self {
            Layer::Input(_) => None,
            Layer::Hidden(l) => Some(&l.z),
            Layer::Terminal(l) => Some(&l.z),
        }
    }

    pub fn penalties(&self) -> Option<Penalties> {
        match self {
            Layer::Input(_) => None,
            Layer::Hidden(l) => l.penalties,
            Layer::Terminal(l) => l.penalties,
        }
    }

    pub(crate) fn unsupported(&self, op: &str) -> Error {
        Error::InvalidConfig(format!("{} layer does not support {op}", self.kind().name()))
    }

    /// Dispatch the weight fit to the variants that have one.
    pub fn fit_weight(&mut self, a_prev: &DMatrix<f64>) -> Result<()> {
        match self {
            Layer::Hidden(l) => l.fit_weight(a_prev),
            Layer::Terminal(l) => l.fit_weight(a_prev),
            Layer::Input(_) => Err(self.unsupported("weight fit")),
        }
    }
}
