use tracing::{debug, info};

use crate::solve::check_penalty;
use crate::{Dataset, DualState, Error, Network, Result, loss, metrics};

/// Penalty weights of the split objective.
///
/// `beta` weights `||Z - W A_prev||^2`, `gamma` weights `||A - h(Z)||^2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penalties {
    pub beta: f64,
    pub gamma: f64,
}

impl Default for Penalties {
    fn default() -> Self {
        Self {
            beta: 1.0,
            gamma: 10.0,
        }
    }
}

impl Penalties {
    pub fn new(beta: f64, gamma: f64) -> Result<Self> {
        let p = Self { beta, gamma };
        p.validate()?;
        Ok(p)
    }

    pub fn validate(self) -> Result<()> {
        check_penalty("beta", self.beta)?;
        check_penalty("gamma", self.gamma)
    }
}

/// Where a hidden layer's activation solve reads the next layer's state from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepSchedule {
    /// Layers are solved strictly in index order. A hidden layer reads the next
    /// layer's `W` and `Z` as they were left at the end of the previous sweep.
    #[default]
    Lagged,
    /// Every layer's weights are refit first, from the activations held at the
    /// start of the sweep. Activation and output solves then run in index order,
    /// so each hidden layer sees the next layer's weights from the current sweep.
    Synchronous,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitConfig {
    /// Default penalties; layers built with their own penalties override these.
    pub penalties: Penalties,
    /// Maximum number of sweeps spent on each example.
    pub sweeps_per_example: usize,
    /// Stop sweeping an example once the terminal residual
    /// `||Z_L - W_L A_{L-1}||_F` drops below this value.
    pub tolerance: Option<f64>,
    pub schedule: SweepSchedule,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            penalties: Penalties::default(),
            sweeps_per_example: 1,
            tolerance: None,
            schedule: SweepSchedule::Lagged,
        }
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<()> {
        self.penalties.validate()?;
        if self.sweeps_per_example == 0 {
            return Err(Error::InvalidConfig(
                "sweeps_per_example must be > 0".to_owned(),
            ));
        }
        if let Some(tol) = self.tolerance {
            if !(tol.is_finite() && tol >= 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "tolerance must be finite and >= 0, got {tol}"
                )));
            }
        }
        Ok(())
    }
}

/// Outcome of one presented block (a single example when `batch_size == 1`).
#[derive(Debug, Clone, PartialEq)]
pub struct ExampleReport {
    pub sweeps: usize,
    /// Terminal primal residual after the last sweep.
    pub residual: f64,
    /// Hinge loss of the terminal output against the target.
    pub loss: f64,
}

/// One [`ExampleReport`] per block, in presentation order.
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    pub examples: Vec<ExampleReport>,
}

impl FitReport {
    pub fn total_sweeps(&self) -> usize {
        self.examples.iter().map(|e| e.sweeps).sum()
    }

    pub fn final_residual(&self) -> Option<f64> {
        self.examples.last().map(|e| e.residual)
    }

    pub fn mean_loss(&self) -> f64 {
        if self.examples.is_empty() {
            return 0.0;
        }
        self.examples.iter().map(|e| e.loss).sum::<f64>() / self.examples.len() as f64
    }
}

impl Network {
    /// Train on every example of `train`, in order.
    ///
    /// Examples are presented in consecutive blocks of `batch_size` columns, so
    /// `train.len()` must be a multiple of the network's batch size. Each block
    /// is swept up to `cfg.sweeps_per_example` times. `dual` carries the
    /// terminal multiplier across sweeps and blocks; its shape must be
    /// `(output_dim, batch_size)`.
    ///
    /// A solver error aborts at the failing block. Layers updated before the
    /// failure keep their new state.
    pub fn fit(
        &mut self,
        train: &Dataset,
        cfg: FitConfig,
        dual: &mut DualState,
    ) -> Result<FitReport> {
        cfg.validate()?;
        if train.is_empty() {
            return Err(Error::InvalidData(
                "train dataset must not be empty".to_owned(),
            ));
        }
        if train.input_dim() != self.input_dim() {
            return Err(Error::InvalidData(format!(
                "train input_dim {} does not match network input_dim {}",
                train.input_dim(),
                self.input_dim()
            )));
        }
        if train.target_dim() != self.output_dim() {
            return Err(Error::InvalidData(format!(
                "train target_dim {} does not match network output_dim {}",
                train.target_dim(),
                self.output_dim()
            )));
        }
        let batch = self.batch_size();
        if !train.len().is_multiple_of(batch) {
            return Err(Error::InvalidData(format!(
                "train len {} is not a multiple of batch_size {batch}",
                train.len()
            )));
        }

        let mut examples = Vec::with_capacity(train.len() / batch);
        for (idx, start) in (0..train.len()).step_by(batch).enumerate() {
            let input = train.input_block(start, batch);
            let target = train.target_block(start, batch);

            let mut sweeps = 0;
            let mut residual = f64::INFINITY;
            while sweeps < cfg.sweeps_per_example {
                let report = self.sweep(&input, &target, dual, &cfg)?;
                sweeps += 1;
                residual = report.residual;
                if cfg.tolerance.is_some_and(|tol| residual < tol) {
                    debug!(block = idx, sweeps, residual, "residual below tolerance");
                    break;
                }
            }

            let loss = loss::hinge_sum(self.terminal().z(), &target)?;
            info!(block = idx, start, sweeps, residual, loss, "block trained");
            examples.push(ExampleReport {
                sweeps,
                residual,
                loss,
            });
        }

        Ok(FitReport { examples })
    }

    /// One-vs-all accuracy of the forward prediction over `data`.
    pub fn evaluate_accuracy(&self, data: &Dataset) -> Result<f64> {
        if data.is_empty() {
            return Err(Error::InvalidData("dataset must not be empty".to_owned()));
        }
        let mut correct = 0usize;
        for idx in 0..data.len() {
            let pred = self.predict(&data.input_matrix(idx))?;
            if metrics::argmax_matches(pred.as_slice(), data.target(idx)) {
                correct += 1;
            }
        }
        Ok(correct as f64 / data.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn penalties_reject_non_positive_values() {
        assert!(Penalties::new(1.0, 10.0).is_ok());
        assert!(Penalties::new(0.0, 10.0).is_err());
        assert!(Penalties::new(1.0, 0.0).is_err());
        assert!(Penalties::new(f64::INFINITY, 1.0).is_err());
    }

    #[test]
    fn fit_config_validation() {
        assert!(FitConfig::default().validate().is_ok());

        let cfg = FitConfig {
            sweeps_per_example: 0,
            ..FitConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = FitConfig {
            tolerance: Some(-1.0),
            ..FitConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn report_aggregates() {
        let report = FitReport {
            examples: vec![
                ExampleReport {
                    sweeps: 2,
                    residual: 0.5,
                    loss: 1.0,
                },
                ExampleReport {
                    sweeps: 1,
                    residual: 0.25,
                    loss: 3.0,
                },
            ],
        };
        assert_eq!(report.total_sweeps(), 3);
        assert_eq!(report.final_residual(), Some(0.25));
        assert_eq!(report.mean_loss(), 2.0);
    }
}
