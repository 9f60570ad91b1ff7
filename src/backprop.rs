//! Backpropagation for one sample.
//!
//! `Backpropagation` is a stateless view over a network's layers and a loss. It
//! reads the `z`/`a` caches left in each layer by the most recent forward pass,
//! so `NeuralNetwork::predict` must have been called on the same sample first.

use crate::error::check_len;
use crate::{Error, Gradients, Layer, Loss, Result};

#[derive(Debug, Clone, Copy)]
pub struct Backpropagation<'a> {
    layers: &'a [Layer],
    loss: Loss,
}

impl<'a> Backpropagation<'a> {
    /// Bind to a network's layers and a loss.
    ///
    /// Fails with `NullInput` if there are no layers to propagate through.
    pub fn new(layers: &'a [Layer], loss: Loss) -> Result<Self> {
        if layers.is_empty() {
            return Err(Error::NullInput(
                "backpropagation needs a network with at least one layer".to_owned(),
            ));
        }
        Ok(Self { layers, loss })
    }

    #[inline]
    pub fn loss(&self) -> Loss {
        self.loss
    }

    /// Deltas (`dL/dz`) for every layer, indexed `[layer][unit]`.
    ///
    /// The output layer uses the loss derivative; every earlier layer uses the
    /// delta and weights of the layer after it.
    pub fn compute_deltas(&self, expected: &[f32]) -> Result<Vec<Vec<f32>>> {
        let last = self.layers.len() - 1;
        check_len(expected, self.layers[last].out_dim(), "expected")?;

        let mut deltas = vec![Vec::new(); self.layers.len()];
        deltas[last] = self.layers[last].backward_output(expected, self.loss)?;

        for l in (0..last).rev() {
            deltas[l] = self.layers[l].backward_hidden(&deltas[l + 1], &self.layers[l + 1])?;
        }

        Ok(deltas)
    }

    /// Add this sample's gradient into `grads`:
    ///
    /// - `d_weights[l][j][i] += delta[l][j] * prev[i]`
    /// - `d_biases[l][j] += delta[l][j]`
    ///
    /// where `prev` is `input` for the first layer and the previous layer's
    /// cached activation otherwise. `grads` is only added into, never cleared.
    pub fn compute(&self, input: &[f32], expected: &[f32], grads: &mut Gradients) -> Result<()> {
        check_len(input, self.layers[0].in_dim(), "input")?;
        grads.check_shape(self.layers)?;

        let deltas = self.compute_deltas(expected)?;

        let mut prev = input;
        for (l, layer) in self.layers.iter().enumerate() {
            let in_dim = layer.in_dim();
            let (dw, db) = grads.layer_mut(l);

            for (j, &d) in deltas[l].iter().enumerate() {
                let row = &mut dw[j * in_dim..(j + 1) * in_dim];
                for (g, &p) in row.iter_mut().zip(prev) {
                    *g = d.mul_add(p, *g);
                }
                db[j] += d;
            }

            prev = layer.output();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::Activation;

    fn two_layer() -> Vec<Layer> {
        vec![
            Layer::from_parts(1, 2, Activation::ReLU, vec![1.0, 2.0], vec![0.0, 0.0]).unwrap(),
            Layer::from_parts(2, 1, Activation::ReLU, vec![0.5, 1.0], vec![0.0]).unwrap(),
        ]
    }

    fn forward(layers: &mut [Layer], input: &[f32]) {
        let mut x = input.to_vec();
        for layer in layers.iter_mut() {
            x = layer.forward(&x).unwrap().to_vec();
        }
    }

    #[test]
    fn empty_network_is_rejected() {
        assert!(matches!(
            Backpropagation::new(&[], Loss::Mse),
            Err(Error::NullInput(_))
        ));
    }

    #[test]
    fn deltas_have_one_row_per_layer() {
        let layers = vec![
            Layer::from_parts(
                2,
                2,
                Activation::ReLU,
                vec![1.0, 0.5, 2.0, 2.5],
                vec![0.0, 0.0],
            )
            .unwrap(),
        ];
        let bp = Backpropagation::new(&layers, Loss::Mse).unwrap();
        let deltas = bp.compute_deltas(&[0.0, 0.0]).unwrap();
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].len(), 2);

        assert!(matches!(
            bp.compute_deltas(&[0.0; 3]),
            Err(Error::DimensionMismatch(_))
        ));
    }

    #[test]
    fn deltas_walk_back_through_hidden_layers() {
        let mut layers = two_layer();
        forward(&mut layers, &[1.0]);
        assert_eq!(layers[1].output(), &[2.5]);

        let bp = Backpropagation::new(&layers, Loss::Mse).unwrap();
        let deltas = bp.compute_deltas(&[2.0]).unwrap();

        // Output: (2.5 - 2.0) * 1 = 0.5; hidden: 0.5 * [0.5, 1.0].
        assert_eq!(deltas[1], vec![0.5]);
        assert_eq!(deltas[0], vec![0.25, 0.5]);
    }

    #[test]
    fn compute_accumulates_into_existing_buffers() {
        let mut layers = two_layer();
        forward(&mut layers, &[1.0]);

        let bp = Backpropagation::new(&layers, Loss::Mse).unwrap();
        let mut grads = Gradients::for_layers(&layers);
        bp.compute(&[1.0], &[2.0], &mut grads).unwrap();

        assert_eq!(grads.d_weights(0), &[0.25, 0.5]);
        assert_eq!(grads.d_biases(0), &[0.25, 0.5]);
        // Previous activation of layer 1 is [1.0, 2.0].
        assert_eq!(grads.d_weights(1), &[0.5, 1.0]);
        assert_eq!(grads.d_biases(1), &[0.5]);

        bp.compute(&[1.0], &[2.0], &mut grads).unwrap();
        assert_eq!(grads.d_weights(1), &[1.0, 2.0]);
        assert_eq!(grads.d_biases(0), &[0.5, 1.0]);
        // `compute` alone does not count samples.
        assert_eq!(grads.count(), 0);
    }

    #[test]
    fn compute_rejects_foreign_buffers_and_bad_input() {
        let mut layers = two_layer();
        forward(&mut layers, &[1.0]);
        let bp = Backpropagation::new(&layers, Loss::Mse).unwrap();

        let mut foreign = Gradients::for_layers(&layers[..1]);
        assert!(matches!(
            bp.compute(&[1.0], &[2.0], &mut foreign),
            Err(Error::Configuration(_))
        ));

        let mut grads = Gradients::for_layers(&layers);
        assert!(matches!(
            bp.compute(&[1.0, 2.0], &[2.0], &mut grads),
            Err(Error::DimensionMismatch(_))
        ));
    }
}
