//! Adam (adaptive moment estimation).
//!
//! Per parameter, with `g` the batch-mean gradient and `t` the number of
//! completed steps:
//!
//! ```text
//! m = beta1 * m + (1 - beta1) * g
//! v = beta2 * v + (1 - beta2) * g^2
//! m_hat = m / (1 - beta1^t)
//! v_hat = v / (1 - beta2^t)
//! param -= lr * m_hat / (sqrt(v_hat) + eps)
//! ```
//!
//! Moment estimates persist across steps for the trainer's whole lifetime; only
//! the gradient accumulator is cleared after each step.

use crate::{Gradients, Layer, Loss, NeuralNetwork, Result};

use super::{Optimizer, Trainable, learn_into};

pub const DEFAULT_LR: f32 = 1e-3;
pub const DEFAULT_BETA1: f32 = 0.9;
pub const DEFAULT_BETA2: f32 = 0.999;
pub const DEFAULT_EPS: f32 = 1e-7;

#[derive(Debug, Clone)]
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    eps: f32,
    loss: Option<Loss>,
    grads: Gradients,
    t: u64,
    beta1_pow: f32,
    beta2_pow: f32,
    m_weights: Vec<Vec<f32>>,
    m_biases: Vec<Vec<f32>>,
    v_weights: Vec<Vec<f32>>,
    v_biases: Vec<Vec<f32>>,
}

impl Adam {
    /// Adam with the default hyperparameters (`lr=1e-3, beta1=0.9, beta2=0.999, eps=1e-7`).
    pub fn new(network: &NeuralNetwork) -> Result<Self> {
        Self::with_params(network, DEFAULT_LR, DEFAULT_BETA1, DEFAULT_BETA2, DEFAULT_EPS)
    }

    pub fn with_params(
        network: &NeuralNetwork,
        lr: f32,
        beta1: f32,
        beta2: f32,
        eps: f32,
    ) -> Result<Self> {
        Self::for_layers(network.layers(), lr, beta1, beta2, eps)
    }

    pub fn for_layers(
        layers: &[Layer],
        lr: f32,
        beta1: f32,
        beta2: f32,
        eps: f32,
    ) -> Result<Self> {
        Optimizer::Adam {
            lr,
            beta1,
            beta2,
            eps,
        }
        .validate()?;

        let grads = Gradients::for_layers(layers);
        let (mw, mb) = zeros_like(&grads);
        let (vw, vb) = zeros_like(&grads);
        Ok(Self {
            lr,
            beta1,
            beta2,
            eps,
            loss: None,
            grads,
            t: 0,
            beta1_pow: 1.0,
            beta2_pow: 1.0,
            m_weights: mw,
            m_biases: mb,
            v_weights: vw,
            v_biases: vb,
        })
    }

    #[inline]
    pub fn lr(&self) -> f32 {
        self.lr
    }

    /// Number of completed (non-empty) steps.
    #[inline]
    pub fn steps(&self) -> u64 {
        self.t
    }

    /// First-moment estimates `(m_weights, m_biases)` of one layer.
    #[inline]
    pub fn first_moments(&self, layer_idx: usize) -> (&[f32], &[f32]) {
        (&self.m_weights[layer_idx], &self.m_biases[layer_idx])
    }

    /// Second-moment estimates `(v_weights, v_biases)` of one layer.
    #[inline]
    pub fn second_moments(&self, layer_idx: usize) -> (&[f32], &[f32]) {
        (&self.v_weights[layer_idx], &self.v_biases[layer_idx])
    }
}

impl Trainable for Adam {
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

        self.t += 1;
        self.beta1_pow *= self.beta1;
        self.beta2_pow *= self.beta2;

        let moments = Moments {
            lr: self.lr,
            beta1: self.beta1,
            beta2: self.beta2,
            eps: self.eps,
            corr1: 1.0 - self.beta1_pow,
            corr2: 1.0 - self.beta2_pow,
        };

        let Adam {
            grads,
            m_weights,
            m_biases,
            v_weights,
            v_biases,
            ..
        } = self;

        // Overwrite the averaged gradient with the Adam step, then apply it at rate 1.
        grads.step_and_reset(|l, dw, db| {
            moments.apply(dw, &mut m_weights[l], &mut v_weights[l]);
            moments.apply(db, &mut m_biases[l], &mut v_biases[l]);
            layers[l].update_from_gradients(1.0, dw, db)
        })?;
        Ok(())
    }

    fn reset(&mut self) {
        self.grads.discard();
    }

    fn pending(&self) -> usize {
        self.grads.count()
    }
}

#[derive(Debug, Clone, Copy)]
struct Moments {
    lr: f32,
    beta1: f32,
    beta2: f32,
    eps: f32,
    corr1: f32,
    corr2: f32,
}

impl Moments {
    /// Update `m`/`v` from the gradients in `g`, then replace `g` with the step.
    #[inline]
    fn apply(&self, g: &mut [f32], m: &mut [f32], v: &mut [f32]) {
        debug_assert_eq!(g.len(), m.len());
        debug_assert_eq!(g.len(), v.len());

        for i in 0..g.len() {
            let grad = g[i];
            m[i] = self.beta1 * m[i] + (1.0 - self.beta1) * grad;
            v[i] = self.beta2 * v[i] + (1.0 - self.beta2) * (grad * grad);

            let m_hat = m[i] / self.corr1;
            let v_hat = v[i] / self.corr2;
            g[i] = self.lr * m_hat / (v_hat.sqrt() + self.eps);
        }
    }
}

fn zeros_like(grads: &Gradients) -> (Vec<Vec<f32>>, Vec<Vec<f32>>) {
    let mut ws = Vec::with_capacity(grads.num_layers());
    let mut bs = Vec::with_capacity(grads.num_layers());
    for l in 0..grads.num_layers() {
        ws.push(vec![0.0; grads.d_weights(l).len()]);
        bs.push(vec![0.0; grads.d_biases(l).len()]);
    }
    (ws, bs)
}
