//! Activation functions.
//!
//! A dense layer computes a pre-activation value `z = W x + b` and then applies an
//! activation function element-wise: `a = activation(z)`.
//!
//! Derivatives are taken with respect to `z`. `Layer` caches both `z` and `a` for
//! the most recent sample, so backprop can evaluate either form.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Slope used by [`Activation::leaky_relu`] for negative inputs.
pub const DEFAULT_LEAKY_ALPHA: f32 = 0.01;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq)]
/// Element-wise activation function.
pub enum Activation {
    Linear,
    #[cfg_attr(feature = "serde", serde(rename = "relu"))]
    ReLU,
    #[cfg_attr(feature = "serde", serde(rename = "leaky_relu"))]
    LeakyReLU { alpha: f32 },
    Sigmoid,
}

impl Activation {
    /// Leaky ReLU with the conventional `alpha = 0.01`.
    #[inline]
    pub const fn leaky_relu() -> Self {
        Activation::LeakyReLU {
            alpha: DEFAULT_LEAKY_ALPHA,
        }
    }

    /// Validate activation parameters.
    pub fn validate(self) -> Result<()> {
        match self {
            Activation::LeakyReLU { alpha } => {
                if !(alpha.is_finite() && alpha >= 0.0) {
                    return Err(Error::Range(format!(
                        "leaky ReLU alpha must be finite and >= 0, got {alpha}"
                    )));
                }
            }
            Activation::Linear | Activation::ReLU | Activation::Sigmoid => {}
        }

        Ok(())
    }

    #[inline]
    pub fn activate(self, z: f32) -> f32 {
        match self {
            Activation::Linear => z,
            Activation::ReLU => z.max(0.0),
            Activation::LeakyReLU { alpha } => {
                if z > 0.0 {
                    z
                } else {
                    alpha * z
                }
            }
            Activation::Sigmoid => sigmoid(z),
        }
    }

    /// Derivative `da/dz` evaluated at the pre-activation `z`.
    #[inline]
    pub fn derivative(self, z: f32) -> f32 {
        match self {
            Activation::Linear => 1.0,
            Activation::ReLU => {
                if z > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::LeakyReLU { alpha } => {
                if z > 0.0 {
                    1.0
                } else {
                    alpha
                }
            }
            Activation::Sigmoid => {
                let a = sigmoid(z);
                a * (1.0 - a)
            }
        }
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    // Numerically stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}
