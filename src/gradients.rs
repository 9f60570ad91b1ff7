//! Per-batch gradient accumulator.
//!
//! `Gradients` holds one weight-gradient matrix and one bias-gradient vector per
//! layer, summed over every sample of the current mini-batch, plus the number of
//! samples summed so far. Trainers own one and drive it through three
//! operations:
//!
//! - [`Gradients::accumulate`]: add one sample's contribution
//! - [`Gradients::step_and_reset`]: average, hand the result to an update rule,
//!   then clear
//! - [`Gradients::discard`]: clear without updating

use crate::{Backpropagation, Error, Layer, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    /// Row-major `(out_dim, in_dim)` per layer.
    d_weights: Vec<Vec<f32>>,
    d_biases: Vec<Vec<f32>>,
    count: usize,
}

impl Gradients {
    /// Zeroed buffers shaped like `layers`.
    pub fn for_layers(layers: &[Layer]) -> Self {
        let mut d_weights = Vec::with_capacity(layers.len());
        let mut d_biases = Vec::with_capacity(layers.len());
        for layer in layers {
            d_weights.push(vec![0.0; layer.in_dim() * layer.out_dim()]);
            d_biases.push(vec![0.0; layer.out_dim()]);
        }
        Self {
            d_weights,
            d_biases,
            count: 0,
        }
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.d_weights.len()
    }

    /// Number of samples accumulated since the last reset.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn d_weights(&self, layer_idx: usize) -> &[f32] {
        &self.d_weights[layer_idx]
    }

    #[inline]
    pub fn d_biases(&self, layer_idx: usize) -> &[f32] {
        &self.d_biases[layer_idx]
    }

    #[inline]
    pub(crate) fn layer_mut(&mut self, layer_idx: usize) -> (&mut [f32], &mut [f32]) {
        (&mut self.d_weights[layer_idx], &mut self.d_biases[layer_idx])
    }

    /// Fails unless these buffers have exactly the shape of `layers`.
    pub fn check_shape(&self, layers: &[Layer]) -> Result<()> {
        if self.d_weights.len() != layers.len() {
            return Err(Error::Configuration(format!(
                "gradient buffers cover {} layers, network has {}",
                self.d_weights.len(),
                layers.len()
            )));
        }
        for (l, layer) in layers.iter().enumerate() {
            if self.d_weights[l].len() != layer.in_dim() * layer.out_dim()
                || self.d_biases[l].len() != layer.out_dim()
            {
                return Err(Error::DimensionMismatch(format!(
                    "gradient buffers for layer {l} do not match shape ({}, {})",
                    layer.out_dim(),
                    layer.in_dim()
                )));
            }
        }
        Ok(())
    }

    /// Add one sample's gradient contribution and bump the sample counter.
    ///
    /// The network's layer caches must hold the forward pass of `input`.
    pub fn accumulate(
        &mut self,
        backprop: &Backpropagation<'_>,
        input: &[f32],
        expected: &[f32],
    ) -> Result<()> {
        backprop.compute(input, expected, self)?;
        self.count += 1;
        Ok(())
    }

    /// Average the accumulated sums, pass each layer's mean gradient to `apply`,
    /// then clear the buffers.
    ///
    /// `apply` receives `(layer_idx, d_weights, d_biases)` and may overwrite the
    /// slices in place (e.g. with an optimizer's step direction).
    ///
    /// Returns `false` without calling `apply` when nothing was accumulated.
    /// If `apply` fails the buffers are still cleared and the error is returned.
    pub fn step_and_reset<F>(&mut self, mut apply: F) -> Result<bool>
    where
        F: FnMut(usize, &mut [f32], &mut [f32]) -> Result<()>,
    {
        if self.count == 0 {
            return Ok(false);
        }

        let scale = 1.0 / self.count as f32;
        let mut outcome = Ok(true);
        for l in 0..self.d_weights.len() {
            let (dw, db) = self.layer_mut(l);
            dw.iter_mut().for_each(|g| *g *= scale);
            db.iter_mut().for_each(|g| *g *= scale);

            if let Err(e) = apply(l, dw, db) {
                outcome = Err(e);
                break;
            }
        }

        self.discard();
        outcome
    }

    /// Zero all buffers and the sample counter.
    pub fn discard(&mut self) {
        for dw in &mut self.d_weights {
            dw.fill(0.0);
        }
        for db in &mut self.d_biases {
            db.fill(0.0);
        }
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{Activation, Loss};

    fn single_layer() -> Vec<Layer> {
        vec![
            Layer::from_parts(
                2,
                2,
                Activation::ReLU,
                vec![1.0, 0.5, 2.0, 2.5],
                vec![0.0, 0.0],
            )
            .unwrap(),
        ]
    }

    #[test]
    fn buffers_follow_layer_shapes() {
        let layers = vec![
            Layer::from_parts(1, 3, Activation::ReLU, vec![0.0; 3], vec![0.0; 3]).unwrap(),
            Layer::from_parts(3, 2, Activation::Linear, vec![0.0; 6], vec![0.0; 2]).unwrap(),
        ];
        let g = Gradients::for_layers(&layers);
        assert_eq!(g.num_layers(), 2);
        assert_eq!(g.d_weights(0).len(), 3);
        assert_eq!(g.d_weights(1).len(), 6);
        assert_eq!(g.d_biases(1).len(), 2);
        assert!(g.is_empty());
        assert!(g.check_shape(&layers).is_ok());
        assert!(g.check_shape(&layers[..1]).is_err());
    }

    #[test]
    fn step_and_reset_averages_then_clears() {
        let mut layers = single_layer();
        let mut g = Gradients::for_layers(&layers);
        let x = [0.5_f32, 1.0];
        let y = [1.0_f32, 0.5];

        for _ in 0..2 {
            layers[0].forward(&x).unwrap();
            let bp = Backpropagation::new(&layers, Loss::Mse).unwrap();
            g.accumulate(&bp, &x, &y).unwrap();
        }
        assert_eq!(g.count(), 2);
        assert_eq!(g.d_biases(0), &[0.0, 6.0]);

        let mut seen = Vec::new();
        let stepped = g
            .step_and_reset(|l, dw, db| {
                seen.push((l, dw.to_vec(), db.to_vec()));
                Ok(())
            })
            .unwrap();

        assert!(stepped);
        assert_eq!(seen, vec![(0, vec![0.0, 0.0, 1.5, 3.0], vec![0.0, 3.0])]);
        assert!(g.is_empty());
        assert_eq!(g.d_weights(0), &[0.0; 4]);
    }

    #[test]
    fn step_on_empty_accumulator_is_a_no_op() {
        let layers = single_layer();
        let mut g = Gradients::for_layers(&layers);
        let stepped = g
            .step_and_reset(|_, _, _| panic!("apply must not run"))
            .unwrap();
        assert!(!stepped);
    }

    #[test]
    fn discard_drops_pending_samples() {
        let mut layers = single_layer();
        let mut g = Gradients::for_layers(&layers);
        let x = [0.5_f32, 1.0];
        layers[0].forward(&x).unwrap();
        let bp = Backpropagation::new(&layers, Loss::Mse).unwrap();
        g.accumulate(&bp, &x, &[0.0, 0.0]).unwrap();
        assert_eq!(g.count(), 1);

        g.discard();
        assert_eq!(g, Gradients::for_layers(&layers));
    }
}
