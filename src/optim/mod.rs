//! Trainers: gradient accumulation plus a parameter-update rule.
//!
//! A [`Trainable`] is driven by the training loop in two beats:
//!
//! - `learn(layers, x, y)` once per sample, right after the forward pass of `x`:
//!   backpropagates and adds the sample's gradient to the trainer's buffers.
//! - `step(layers)` once per mini-batch: applies the batch-averaged gradient to
//!   every layer and clears the buffers. A step with nothing accumulated is a
//!   no-op.
//!
//! Trainer *state* (accumulators, Adam moments) lives in the trainer, never in
//! the layers.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Backpropagation, Error, Gradients, Layer, Loss, NeuralNetwork, Result};

pub mod adam;
pub mod sgd;

pub use adam::Adam;
pub use sgd::Sgd;

pub trait Trainable: fmt::Debug {
    /// Bind the loss used to seed backpropagation.
    fn set_loss(&mut self, loss: Loss);

    /// Accumulate the gradient of one sample.
    ///
    /// The layers' caches must hold the forward pass of `input`.
    fn learn(&mut self, layers: &[Layer], input: &[f32], expected: &[f32]) -> Result<()>;

    /// Apply the averaged accumulated gradient to `layers`, then clear it.
    fn step(&mut self, layers: &mut [Layer]) -> Result<()>;

    /// Drop accumulated gradients without updating anything.
    fn reset(&mut self);

    /// Samples accumulated since the last step or reset.
    fn pending(&self) -> usize;
}

/// Shared `learn` body: bind a backprop view and accumulate into `grads`.
pub(crate) fn learn_into(
    grads: &mut Gradients,
    loss: Option<Loss>,
    layers: &[Layer],
    input: &[f32],
    expected: &[f32],
) -> Result<()> {
    let loss = loss.ok_or_else(|| {
        Error::NullInput("trainer has no loss function; call NeuralNetwork::setup first".to_owned())
    })?;
    let backprop = Backpropagation::new(layers, loss)?;
    grads.accumulate(&backprop, input, expected)
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq)]
/// Trainer choice, as plain configuration.
pub enum Optimizer {
    /// Mini-batch gradient descent with a fixed learning rate.
    Sgd { lr: f32 },
    /// Adam (bias-corrected).
    Adam {
        lr: f32,
        beta1: f32,
        beta2: f32,
        eps: f32,
    },
}

impl Default for Optimizer {
    fn default() -> Self {
        Optimizer::Adam {
            lr: adam::DEFAULT_LR,
            beta1: adam::DEFAULT_BETA1,
            beta2: adam::DEFAULT_BETA2,
            eps: adam::DEFAULT_EPS,
        }
    }
}

impl Optimizer {
    /// Validate optimizer hyperparameters.
    pub fn validate(self) -> Result<()> {
        match self {
            Optimizer::Sgd { lr } => validate_lr(lr),
            Optimizer::Adam {
                lr,
                beta1,
                beta2,
                eps,
            } => {
                validate_lr(lr)?;
                if !(beta1.is_finite() && (0.0..1.0).contains(&beta1)) {
                    return Err(Error::Range(format!(
                        "adam beta1 must be finite and in [0,1), got {beta1}"
                    )));
                }
                if !(beta2.is_finite() && (0.0..1.0).contains(&beta2)) {
                    return Err(Error::Range(format!(
                        "adam beta2 must be finite and in [0,1), got {beta2}"
                    )));
                }
                if !(eps.is_finite() && eps > 0.0) {
                    return Err(Error::Range(format!(
                        "adam eps must be finite and > 0, got {eps}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Allocate a trainer sized for `network`.
    pub fn build(self, network: &NeuralNetwork) -> Result<Box<dyn Trainable>> {
        self.validate()?;

        Ok(match self {
            Optimizer::Sgd { lr } => Box::new(Sgd::new(network, lr)?),
            Optimizer::Adam {
                lr,
                beta1,
                beta2,
                eps,
            } => Box::new(Adam::with_params(network, lr, beta1, beta2, eps)?),
        })
    }
}

pub(crate) fn validate_lr(lr: f32) -> Result<()> {
    if !(lr.is_finite() && lr > 0.0) {
        return Err(Error::Range(format!(
            "learning rate must be finite and > 0, got {lr}"
        )));
    }
    Ok(())
}
