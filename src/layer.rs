//! Dense layer: one affine transform followed by an element-wise activation.
//!
//! A `Layer` caches the pre-activation `z` and activation `a` of the most recent
//! sample passed to [`Layer::forward`]. Backward calls read that cache, so for a
//! given layer instance `forward` must immediately precede the matching
//! `backward_*` call for the same sample. The cache holds exactly one sample:
//! pipelining several samples through the same instance is not supported.

use rand::Rng;

use crate::error::check_len;
use crate::{Activation, Error, Init, Loss, Result};

#[derive(Debug, Clone)]
pub struct Layer {
    in_dim: usize,
    out_dim: usize,
    /// Row-major matrix with shape (out_dim, in_dim).
    weights: Vec<f32>,
    biases: Vec<f32>,
    activation: Activation,
    /// Pre-activation of the last forward pass.
    z: Vec<f32>,
    /// Activation of the last forward pass.
    a: Vec<f32>,
}

impl Layer {
    /// Build a layer with parameters drawn from `init`.
    pub fn new<R: Rng + ?Sized>(
        in_dim: usize,
        out_dim: usize,
        activation: Activation,
        init: Init,
        rng: &mut R,
    ) -> Result<Self> {
        activation.validate()?;
        let (weights, biases) = init.params(in_dim, out_dim, rng)?;
        Self::from_parts(in_dim, out_dim, activation, weights, biases)
    }

    /// Build a layer from explicit parameters.
    ///
    /// `weights` is row-major with shape `(out_dim, in_dim)`.
    pub fn from_parts(
        in_dim: usize,
        out_dim: usize,
        activation: Activation,
        weights: Vec<f32>,
        biases: Vec<f32>,
    ) -> Result<Self> {
        if in_dim == 0 || out_dim == 0 {
            return Err(Error::Range(format!(
                "layer dims must be > 0, got in_dim={in_dim} out_dim={out_dim}"
            )));
        }
        activation.validate()?;
        check_len(&weights, in_dim * out_dim, "weights")?;
        check_len(&biases, out_dim, "biases")?;

        Ok(Self {
            in_dim,
            out_dim,
            weights,
            biases,
            activation,
            z: vec![0.0; out_dim],
            a: vec![0.0; out_dim],
        })
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
    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Row-major weights, shape `(out_dim, in_dim)`.
    #[inline]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    #[inline]
    pub fn biases(&self) -> &[f32] {
        &self.biases
    }

    /// Weight connecting input `i` to output unit `j`.
    ///
    /// Panics if `j >= out_dim` or `i >= in_dim`.
    #[inline]
    pub fn weight(&self, j: usize, i: usize) -> f32 {
        assert!(
            j < self.out_dim && i < self.in_dim,
            "weight index ({j}, {i}) out of bounds for shape ({}, {})",
            self.out_dim,
            self.in_dim
        );
        self.weights[j * self.in_dim + i]
    }

    /// Weights as one `Vec` per output unit.
    pub fn weight_rows(&self) -> Vec<Vec<f32>> {
        self.weights
            .chunks_exact(self.in_dim)
            .map(<[f32]>::to_vec)
            .collect()
    }

    /// Cached pre-activation `z` of the last forward pass.
    #[inline]
    pub fn pre_activation(&self) -> &[f32] {
        &self.z
    }

    /// Cached activation `a` of the last forward pass.
    #[inline]
    pub fn output(&self) -> &[f32] {
        &self.a
    }

    #[inline]
    pub fn parameter_count(&self) -> usize {
        self.weights.len() + self.biases.len()
    }

    /// Replace all parameters.
    ///
    /// `weights` must have exactly `out_dim` rows of `in_dim` columns and `biases`
    /// exactly `out_dim` entries; nothing is modified otherwise.
    pub fn set(&mut self, weights: &[Vec<f32>], biases: &[f32]) -> Result<()> {
        if weights.len() != self.out_dim {
            return Err(Error::DimensionMismatch(format!(
                "weights have {} rows, expected {}",
                weights.len(),
                self.out_dim
            )));
        }
        for (j, row) in weights.iter().enumerate() {
            if row.len() != self.in_dim {
                return Err(Error::DimensionMismatch(format!(
                    "weights row {j} has len {}, expected {} (shape ({}, {}))",
                    row.len(),
                    self.in_dim,
                    self.out_dim,
                    self.in_dim
                )));
            }
        }
        check_len(biases, self.out_dim, "biases")?;

        for (dst, row) in self.weights.chunks_exact_mut(self.in_dim).zip(weights) {
            dst.copy_from_slice(row);
        }
        self.biases.copy_from_slice(biases);
        Ok(())
    }

    /// Forward pass for a single sample.
    ///
    /// Computes and caches:
    /// - `z = W * input + b`
    /// - `a = activation(z)`
    ///
    /// Returns the cached `a`.
    pub fn forward(&mut self, input: &[f32]) -> Result<&[f32]> {
        check_len(input, self.in_dim, "input")?;

        for j in 0..self.out_dim {
            let mut sum = self.biases[j];
            let row = j * self.in_dim;
            for i in 0..self.in_dim {
                sum = self.weights[row + i].mul_add(input[i], sum);
            }
            self.z[j] = sum;
            self.a[j] = self.activation.activate(sum);
        }

        Ok(&self.a)
    }

    /// Output-layer delta: `delta[j] = loss'(a[j], expected[j]) * act'(z[j])`.
    ///
    /// Reads the cache of the preceding `forward` call.
    pub fn backward_output(&self, expected: &[f32], loss: Loss) -> Result<Vec<f32>> {
        check_len(expected, self.out_dim, "expected")?;

        let delta = (0..self.out_dim)
            .map(|j| {
                let dc_da = loss.derivative(self.a[j], expected[j]);
                dc_da * self.activation.derivative(self.z[j])
            })
            .collect();
        Ok(delta)
    }

    /// Hidden-layer delta:
    /// `delta[j] = (sum_k next_delta[k] * next.W[k][j]) * act'(z[j])`.
    ///
    /// Reads the cache of the preceding `forward` call.
    pub fn backward_hidden(&self, next_delta: &[f32], next: &Layer) -> Result<Vec<f32>> {
        check_len(next_delta, next.out_dim, "next_delta")?;
        if self.out_dim != next.in_dim {
            return Err(Error::LayerMismatch(format!(
                "this layer out_dim {} does not match next layer in_dim {}",
                self.out_dim, next.in_dim
            )));
        }

        let delta = (0..self.out_dim)
            .map(|j| {
                let mut dc_da = 0.0_f32;
                for (k, &d) in next_delta.iter().enumerate() {
                    dc_da = d.mul_add(next.weights[k * next.in_dim + j], dc_da);
                }
                dc_da * self.activation.derivative(self.z[j])
            })
            .collect();
        Ok(delta)
    }

    /// Gradient-descent step from one sample's delta:
    /// `W[j][i] -= rate * delta[j] * prev[i]`, `b[j] -= rate * delta[j]`.
    pub fn update_from_delta(&mut self, rate: f32, delta: &[f32], prev: &[f32]) -> Result<()> {
        check_len(delta, self.out_dim, "delta")?;
        check_len(prev, self.in_dim, "previous activation")?;

        for j in 0..self.out_dim {
            let row = j * self.in_dim;
            for i in 0..self.in_dim {
                self.weights[row + i] -= rate * delta[j] * prev[i];
            }
            self.biases[j] -= rate * delta[j];
        }
        Ok(())
    }

    /// Gradient-descent step from already aggregated gradients:
    /// `W -= rate * d_weights`, `b -= rate * d_biases`.
    ///
    /// `d_weights` is row-major with the same shape as the weights.
    pub fn update_from_gradients(
        &mut self,
        rate: f32,
        d_weights: &[f32],
        d_biases: &[f32],
    ) -> Result<()> {
        check_len(d_weights, self.weights.len(), "weight gradients")?;
        check_len(d_biases, self.out_dim, "bias gradients")?;

        for (w, &g) in self.weights.iter_mut().zip(d_weights) {
            *w -= rate * g;
        }
        for (b, &g) in self.biases.iter_mut().zip(d_biases) {
            *b -= rate * g;
        }
        Ok(())
    }
}
