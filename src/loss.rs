//! Loss functions.
//!
//! A loss aggregates a whole prediction vector into one scalar (`loss`) and
//! exposes the per-element derivative `dL/dp` used to seed backprop
//! (`derivative`).
//!
//! Both supported losses share the derivative `p - e`; they differ only in
//! whether the aggregate is averaged (`Mse`) or summed (`Quadratic`). The
//! derivative is not divided by `N`: it is exact for `Quadratic` and off by the
//! constant `1/N` for `Mse`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Supported loss functions.
pub enum Loss {
    /// `mean_i 0.5 * (p_i - e_i)^2`
    #[default]
    Mse,
    /// `sum_i 0.5 * (p_i - e_i)^2`
    Quadratic,
}

impl Loss {
    /// Aggregate loss over a prediction vector.
    ///
    /// Returns `0.0` for empty inputs.
    pub fn loss(self, predicted: &[f32], expected: &[f32]) -> Result<f32> {
        if predicted.len() != expected.len() {
            return Err(Error::DimensionMismatch(format!(
                "predicted len {} does not match expected len {}",
                predicted.len(),
                expected.len()
            )));
        }
        if predicted.is_empty() {
            return Ok(0.0);
        }

        let sum = half_sum_sq(predicted, expected);
        Ok(match self {
            Loss::Mse => sum / predicted.len() as f32,
            Loss::Quadratic => sum,
        })
    }

    /// Per-element derivative `dL/dp` for one prediction/target pair.
    #[inline]
    pub fn derivative(self, predicted: f32, expected: f32) -> f32 {
        match self {
            Loss::Mse | Loss::Quadratic => predicted - expected,
        }
    }
}

#[inline]
fn half_sum_sq(predicted: &[f32], expected: &[f32]) -> f32 {
    let mut sum_sq = 0.0_f32;
    for (&p, &e) in predicted.iter().zip(expected) {
        let diff = p - e;
        sum_sq = diff.mul_add(diff, sum_sq);
    }
    0.5 * sum_sq
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mse_of_identical_vectors_is_zero() {
        let p = [0.3_f32, -1.5, 42.0];
        assert_eq!(Loss::Mse.loss(&p, &p).unwrap(), 0.0);
        assert_eq!(Loss::Quadratic.loss(&p, &p).unwrap(), 0.0);
    }

    #[test]
    fn mse_averages_and_quadratic_sums() {
        let p = [1.0_f32, 3.0];
        let e = [0.0_f32, 1.0];
        // 0.5 * (1 + 4) = 2.5
        assert!((Loss::Quadratic.loss(&p, &e).unwrap() - 2.5).abs() < 1e-6);
        assert!((Loss::Mse.loss(&p, &e).unwrap() - 1.25).abs() < 1e-6);
    }

    #[test]
    fn derivative_is_prediction_minus_target() {
        assert_eq!(Loss::Mse.derivative(3.5, 0.5), 3.0);
        assert_eq!(Loss::Mse.derivative(1.0, 1.0), 0.0);
        assert_eq!(Loss::Quadratic.derivative(-1.0, 2.0), -3.0);
    }

    #[test]
    fn loss_rejects_length_mismatch_and_handles_empty() {
        let err = Loss::Mse.loss(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch(_)));

        assert_eq!(Loss::Mse.loss(&[], &[]).unwrap(), 0.0);
    }
}
