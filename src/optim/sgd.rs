//! Plain mini-batch gradient descent.

use crate::{Gradients, Layer, Loss, NeuralNetwork, Result};

use super::{Trainable, learn_into, validate_lr};

/// Mini-batch gradient descent with a fixed learning rate.
///
/// Each step applies `param -= lr * mean_batch_gradient`.
#[derive(Debug, Clone)]
pub struct Sgd {
    lr: f32,
    loss: Option<Loss>,
    grads: Gradients,
}

impl Sgd {
    /// Construct an SGD trainer sized for `network`.
    ///
    /// Returns an error if `lr` is not finite or `lr <= 0`.
    pub fn new(network: &NeuralNetwork, lr: f32) -> Result<Self> {
        Self::for_layers(network.layers(), lr)
    }

    /// Construct an SGD trainer sized for `layers`.
    pub fn for_layers(layers: &[Layer], lr: f32) -> Result<Self> {
        validate_lr(lr)?;
        Ok(Self {
            lr,
            loss: None,
            grads: Gradients::for_layers(layers),
        })
    }

    #[inline]
    pub fn lr(&self) -> f32 {
        self.lr
    }

    #[inline]
    pub fn gradients(&self) -> &Gradients {
        &self.grads
    }
}

impl Trainable for Sgd {
    fn set_loss(&mut self, loss: Loss) {
        self.loss = Some(loss);
    }

    fn learn(&mut self, layers: &[Layer], input: &[f32], expected: &[f32]) -> Result<()> {
        learn_into(&mut self.grads, self.loss, layers, input, expected)
    }

    fn step(&mut self, layers: &mut [Layer]) -> Result<()> {
        if self.grads.is_empty() {
            return Ok(());
        }
        self.grads.check_shape(layers)?;

        let lr = self.lr;
        self.grads
            .step_and_reset(|l, dw, db| layers[l].update_from_gradients(lr, dw, db))?;
        Ok(())
    }

    fn reset(&mut self) {
        self.grads.discard();
    }

    fn pending(&self) -> usize {
        self.grads.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{Activation, Error};

    fn one_unit() -> Vec<Layer> {
        vec![Layer::from_parts(1, 1, Activation::Linear, vec![1.0], vec![2.0]).unwrap()]
    }

    #[test]
    fn sgd_requires_positive_finite_lr() {
        let layers = one_unit();
        assert!(Sgd::for_layers(&layers, 0.0).is_err());
        assert!(Sgd::for_layers(&layers, -1.0).is_err());
        assert!(Sgd::for_layers(&layers, f32::NAN).is_err());
    }

    #[test]
    fn step_applies_batch_mean_gradient() {
        let mut layers = one_unit();
        let mut sgd = Sgd::for_layers(&layers, 0.1).unwrap();
        sgd.set_loss(Loss::Mse);

        // Linear unit w=1, b=2. Samples (x, y) = (1, 0) and (3, 0):
        // predictions 3 and 5, deltas 3 and 5.
        // mean dW = (3*1 + 5*3) / 2 = 9, mean dB = (3 + 5) / 2 = 4.
        for x in [1.0_f32, 3.0] {
            layers[0].forward(&[x]).unwrap();
            sgd.learn(&layers, &[x], &[0.0]).unwrap();
        }
        assert_eq!(sgd.pending(), 2);

        sgd.step(&mut layers).unwrap();
        assert!((layers[0].weights()[0] - (1.0 - 0.1 * 9.0)).abs() < 1e-6);
        assert!((layers[0].biases()[0] - (2.0 - 0.1 * 4.0)).abs() < 1e-6);
        assert_eq!(sgd.pending(), 0);
        assert!(sgd.gradients().is_empty());
    }

    #[test]
    fn step_without_samples_changes_nothing() {
        let mut layers = one_unit();
        let mut sgd = Sgd::for_layers(&layers, 0.1).unwrap();
        sgd.step(&mut layers).unwrap();
        assert_eq!(layers[0].weights(), &[1.0]);
        assert_eq!(layers[0].biases(), &[2.0]);
    }

    #[test]
    fn reset_discards_pending_gradient() {
        let mut layers = one_unit();
        let mut sgd = Sgd::for_layers(&layers, 0.1).unwrap();
        sgd.set_loss(Loss::Mse);
        layers[0].forward(&[1.0]).unwrap();
        sgd.learn(&layers, &[1.0], &[0.0]).unwrap();

        sgd.reset();
        sgd.step(&mut layers).unwrap();
        assert_eq!(layers[0].weights(), &[1.0]);
    }

    #[test]
    fn step_rejects_a_different_network() {
        let mut layers = one_unit();
        let mut sgd = Sgd::for_layers(&layers, 0.1).unwrap();
        sgd.set_loss(Loss::Mse);
        layers[0].forward(&[1.0]).unwrap();
        sgd.learn(&layers, &[1.0], &[0.0]).unwrap();

        let mut other =
            vec![Layer::from_parts(2, 1, Activation::Linear, vec![1.0, 1.0], vec![0.0]).unwrap()];
        assert!(matches!(
            sgd.step(&mut other),
            Err(Error::DimensionMismatch(_))
        ));
    }
}
