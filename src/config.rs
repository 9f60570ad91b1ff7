//! Session configuration.
//!
//! The defaults reproduce the reference function-approximation service:
//! a `1 -> 32 -> 32 -> 1` network (ReLU, ReLU, Linear), Xavier init, Adam with
//! its default hyperparameters, MSE, a 20% validation split and batches of 256.

#[cfg(feature = "serde")]
use std::fs;
#[cfg(feature = "serde")]
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::builder::LayerSpec;
use crate::data::validate_split;
use crate::{Activation, Error, Init, Loss, Optimizer, Result};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Widths of the hidden layers, input side first.
    pub hidden: Vec<usize>,
    pub hidden_activation: Activation,
    pub output_activation: Activation,
    pub init: Init,
    pub optimizer: Optimizer,
    pub loss: Loss,
    pub split: f64,
    pub batch_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            hidden: vec![32, 32],
            hidden_activation: Activation::ReLU,
            output_activation: Activation::Linear,
            init: Init::Xavier,
            optimizer: Optimizer::default(),
            loss: Loss::Mse,
            split: 0.2,
            batch_size: 256,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(i) = self.hidden.iter().position(|&w| w == 0) {
            return Err(Error::Range(format!("hidden layer {i} has width 0")));
        }
        self.hidden_activation.validate()?;
        self.output_activation.validate()?;
        self.optimizer.validate()?;
        validate_split(self.split)?;
        if self.batch_size == 0 {
            return Err(Error::Range("batch_size must be > 0".to_owned()));
        }
        Ok(())
    }

    /// Layer specs for a network mapping `input_dim` features to `output_dim` targets.
    pub fn layer_specs(&self, input_dim: usize, output_dim: usize) -> Vec<LayerSpec> {
        let mut specs = Vec::with_capacity(self.hidden.len() + 1);
        let mut in_dim = input_dim;
        for &width in &self.hidden {
            specs.push(LayerSpec::new(in_dim, width, self.hidden_activation).with_init(self.init));
            in_dim = width;
        }
        specs.push(LayerSpec::new(in_dim, output_dim, self.output_activation).with_init(self.init));
        specs
    }

    /// Parse and validate a JSON config. Missing fields take their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::Configuration(format!("invalid session config: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

/// Read, parse and validate a JSON session config file.
#[cfg(feature = "serde")]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SessionConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        Error::Configuration(format!("failed to read config {}: {e}", path.display()))
    })?;
    SessionConfig::from_json_str(&contents)
}
