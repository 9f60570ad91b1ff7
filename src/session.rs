//! A training session over scalar samples.
//!
//! `Session` is what a streaming front end drives: it owns a network set up from
//! a [`SessionConfig`], the split dataset and the random source, advances one
//! epoch per [`Session::next`] call and produces [`Snapshot`]s of the current
//! fit between epochs.

use std::ops::ControlFlow;

use rand::Rng;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::{Dataset, Error, NeuralNetwork, Result, Samples, SessionConfig};

/// Progress report after a completed epoch.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub epoch: usize,
    pub x: Vec<f32>,
    pub prediction: Vec<f32>,
    pub train_loss: f32,
    /// `None` when the validation partition is empty.
    pub val_loss: Option<f32>,
}

#[derive(Debug)]
pub struct Session<R> {
    network: NeuralNetwork,
    dataset: Dataset<R>,
    x: Vec<f32>,
    batch_size: usize,
    epoch: usize,
}

impl<R: Rng> Session<R> {
    /// Build a network from `config` (initialized from `rng`), bind its trainer
    /// and loss, and split `x`, `y` into training and validation partitions.
    pub fn new(x: &[f32], y: &[f32], config: &SessionConfig, mut rng: R) -> Result<Self> {
        config.validate()?;
        let samples = Samples::from_scalars(x, y)?;

        let mut network = NeuralNetwork::from_specs(&config.layer_specs(1, 1), &mut rng)?;
        let trainer = config.optimizer.build(&network)?;
        network.setup(trainer, config.loss);

        let dataset = Dataset::from_samples(samples, config.split, rng)?;
        log::debug!(
            "session ready: {} train / {} validation samples, {} layers",
            dataset.train().len(),
            dataset.validation().len(),
            network.num_layers()
        );

        Ok(Self {
            network,
            dataset,
            x: x.to_vec(),
            batch_size: config.batch_size,
            epoch: 0,
        })
    }

    /// Train for exactly one more epoch.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<()> {
        self.network.fit_next(&mut self.dataset, self.batch_size)?;
        self.epoch += 1;
        Ok(())
    }

    /// Run `epochs` more epochs, handing a snapshot over the session's own `x`
    /// to `on_snapshot` after every epoch divisible by `interval`.
    ///
    /// Returning `ControlFlow::Break` stops after the epoch just reported.
    /// Returns the number of epochs actually run.
    pub fn run<F>(&mut self, epochs: usize, interval: usize, mut on_snapshot: F) -> Result<usize>
    where
        F: FnMut(&Snapshot) -> ControlFlow<()>,
    {
        if epochs == 0 {
            return Err(Error::Range("epochs must be > 0".to_owned()));
        }
        if interval == 0 {
            return Err(Error::Range("interval must be > 0".to_owned()));
        }

        let x = self.x.clone();
        for done in 1..=epochs {
            self.next()?;
            if self.epoch % interval == 0 {
                let snapshot = self.snapshot(&x)?;
                if on_snapshot(&snapshot).is_break() {
                    return Ok(done);
                }
            }
        }
        Ok(epochs)
    }
}

impl<R> Session<R> {
    /// Completed epochs.
    #[inline]
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    #[inline]
    pub fn network(&self) -> &NeuralNetwork {
        &self.network
    }

    #[inline]
    pub fn dataset(&self) -> &Dataset<R> {
        &self.dataset
    }

    /// Predict each scalar in `xs` independently.
    pub fn predict(&mut self, xs: &[f32]) -> Result<Vec<f32>> {
        let mut out = Vec::with_capacity(xs.len());
        for &x in xs {
            out.push(self.network.predict(&[x])?[0]);
        }
        Ok(out)
    }

    pub fn train_loss(&mut self) -> Result<f32> {
        self.network.calculate_loss(self.dataset.train())
    }

    /// Loss over the validation partition, or `None` if it is empty.
    pub fn val_loss(&mut self) -> Result<Option<f32>> {
        if self.dataset.validation().is_empty() {
            return Ok(None);
        }
        self.network
            .calculate_loss(self.dataset.validation())
            .map(Some)
    }

    pub fn snapshot(&mut self, xs: &[f32]) -> Result<Snapshot> {
        let snapshot = Snapshot {
            epoch: self.epoch,
            x: xs.to_vec(),
            prediction: self.predict(xs)?,
            train_loss: self.train_loss()?,
            val_loss: self.val_loss()?,
        };
        log::debug!(
            "snapshot at epoch {}: loss {} val_loss {:?}",
            snapshot.epoch,
            snapshot.train_loss,
            snapshot.val_loss
        );
        Ok(snapshot)
    }
}
