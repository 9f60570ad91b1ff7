//! Weight initializers.
//!
//! Both schemes draw weights from a zero-mean normal distribution and set biases
//! to zero; they differ only in the standard deviation.

use rand::Rng;
use rand_distr::{Distribution, Normal};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Init {
    /// Glorot: `N(0, sqrt(2 / (fan_in + fan_out)))`.
    #[default]
    Xavier,
    /// Kaiming: `N(0, sqrt(2 / fan_in))`.
    He,
}

impl Init {
    /// Standard deviation of the weight distribution for a layer of this shape.
    #[inline]
    pub fn std_dev(self, in_dim: usize, out_dim: usize) -> f32 {
        match self {
            Init::Xavier => (2.0 / (in_dim + out_dim) as f32).sqrt(),
            Init::He => (2.0 / in_dim as f32).sqrt(),
        }
    }

    /// Draw a fresh `(weights, biases)` pair.
    ///
    /// Weights are row-major with shape `(out_dim, in_dim)`; biases are zero.
    pub fn params<R: Rng + ?Sized>(
        self,
        in_dim: usize,
        out_dim: usize,
        rng: &mut R,
    ) -> Result<(Vec<f32>, Vec<f32>)> {
        if in_dim == 0 || out_dim == 0 {
            return Err(Error::Range(format!(
                "layer dims must be > 0, got in_dim={in_dim} out_dim={out_dim}"
            )));
        }

        let std = self.std_dev(in_dim, out_dim);
        let normal = Normal::new(0.0_f32, std)
            .map_err(|e| Error::Configuration(format!("invalid init distribution: {e}")))?;

        let weights = (0..in_dim * out_dim).map(|_| normal.sample(rng)).collect();
        let biases = vec![0.0; out_dim];
        Ok((weights, biases))
    }
}
