use std::path::Path;

use crate::error::check_len;
use crate::{Error, Layer, Loss, Result, Trainable};

/// Feed-forward network: an ordered, size-compatible sequence of layers.
///
/// Prediction only needs the layers. Training additionally needs a trainer and a
/// loss, bound once via [`NeuralNetwork::setup`].
#[derive(Debug)]
pub struct NeuralNetwork {
    layers: Vec<Layer>,
    trainer: Option<Box<dyn Trainable>>,
    loss: Option<Loss>,
}

impl NeuralNetwork {
    /// Compose `layers` in order.
    ///
    /// Fails with `Configuration` if the list is empty or if any layer's
    /// `out_dim` differs from the next layer's `in_dim`.
    pub fn new(layers: Vec<Layer>) -> Result<Self> {
        if layers.is_empty() {
            return Err(Error::Configuration(
                "network must have at least one layer".to_owned(),
            ));
        }
        for (i, pair) in layers.windows(2).enumerate() {
            if pair[0].out_dim() != pair[1].in_dim() {
                return Err(Error::Configuration(format!(
                    "layers not connected: layer {i} out_dim {} does not match layer {} in_dim {}",
                    pair[0].out_dim(),
                    i + 1,
                    pair[1].in_dim()
                )));
            }
        }

        Ok(Self {
            layers,
            trainer: None,
            loss: None,
        })
    }

    /// Bind the trainer and loss used by `fit` / `fit_next`.
    ///
    /// The trainer is told about the loss so it can backpropagate.
    pub fn setup(&mut self, mut trainer: Box<dyn Trainable>, loss: Loss) {
        trainer.set_loss(loss);
        self.trainer = Some(trainer);
        self.loss = Some(loss);
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.layers[0].in_dim()
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.layers[self.layers.len() - 1].out_dim()
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    #[inline]
    pub fn layer(&self, idx: usize) -> Option<&Layer> {
        self.layers.get(idx)
    }

    /// Mutable access to one layer, e.g. to overwrite its parameters.
    #[inline]
    pub fn layer_mut(&mut self, idx: usize) -> Option<&mut Layer> {
        self.layers.get_mut(idx)
    }

    #[inline]
    pub fn loss(&self) -> Option<Loss> {
        self.loss
    }

    #[inline]
    pub fn has_trainer(&self) -> bool {
        self.trainer.is_some()
    }

    #[inline]
    pub fn trainer(&self) -> Option<&dyn Trainable> {
        self.trainer.as_deref()
    }

    /// Forward pass through every layer.
    ///
    /// Leaves each layer's `z`/`a` cache holding this sample, which is what the
    /// trainer's `learn` reads next.
    pub fn predict(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        check_len(input, self.input_dim(), "input")?;

        for idx in 0..self.layers.len() {
            if idx == 0 {
                self.layers[0].forward(input)?;
            } else {
                // Borrow the previous output immutably and the current layer mutably.
                let (left, right) = self.layers.split_at_mut(idx);
                right[0].forward(left[idx - 1].output())?;
            }
        }

        Ok(self.layers[self.layers.len() - 1].output().to_vec())
    }

    /// Split borrow for the training loop: the layers and the bound trainer.
    pub(crate) fn layers_and_trainer(&mut self) -> Result<(&mut [Layer], &mut dyn Trainable)> {
        let trainer: &mut dyn Trainable = self.trainer.as_deref_mut().ok_or_else(not_set_up)?;
        Ok((self.layers.as_mut_slice(), trainer))
    }

    /// Persisting networks is not supported.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        Err(Error::UnsupportedOperation(format!(
            "saving a network ({}) is not implemented",
            path.as_ref().display()
        )))
    }

    /// Persisting networks is not supported.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        Err(Error::UnsupportedOperation(format!(
            "loading a network ({}) is not implemented",
            path.as_ref().display()
        )))
    }
}

pub(crate) fn not_set_up() -> Error {
    Error::Configuration(
        "trainer and loss function must be set with setup() before training".to_owned(),
    )
}
