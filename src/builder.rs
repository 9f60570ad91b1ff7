//! Network construction from layer specifications.
//!
//! A [`LayerSpec`] names a layer's shape, activation and (optionally) its
//! initializer; [`NeuralNetwork::from_specs`] turns an ordered list of them into
//! a network. [`NetworkBuilder`] is the chained form that only asks for each
//! layer's output width.
//!
//! Layers without an explicit initializer use Xavier.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Activation, Error, Init, Layer, NeuralNetwork, Result};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerSpec {
    pub input_size: usize,
    pub output_size: usize,
    pub activation: Activation,
    #[cfg_attr(feature = "serde", serde(default))]
    pub init: Option<Init>,
}

impl LayerSpec {
    pub fn new(input_size: usize, output_size: usize, activation: Activation) -> Self {
        Self {
            input_size,
            output_size,
            activation,
            init: None,
        }
    }

    pub fn with_init(mut self, init: Init) -> Self {
        self.init = Some(init);
        self
    }

    /// Draw a fresh layer for this spec.
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Layer> {
        Layer::new(
            self.input_size,
            self.output_size,
            self.activation,
            self.init.unwrap_or_default(),
            rng,
        )
    }
}

impl NeuralNetwork {
    /// Build every layer from `specs` (in order) and compose them.
    ///
    /// Fails with `Configuration` if `specs` is empty or adjacent sizes
    /// disagree; the adjacency check runs before any parameters are drawn.
    pub fn from_specs<R: Rng + ?Sized>(specs: &[LayerSpec], rng: &mut R) -> Result<Self> {
        if specs.is_empty() {
            return Err(Error::Configuration(
                "network must have at least one layer".to_owned(),
            ));
        }
        for (i, pair) in specs.windows(2).enumerate() {
            if pair[0].output_size != pair[1].input_size {
                return Err(Error::Configuration(format!(
                    "layers not connected: spec {i} output_size {} does not match spec {} input_size {}",
                    pair[0].output_size,
                    i + 1,
                    pair[1].input_size
                )));
            }
        }

        let layers = specs
            .iter()
            .map(|spec| spec.build(rng))
            .collect::<Result<Vec<_>>>()?;
        NeuralNetwork::new(layers)
    }
}

/// Chained builder for a [`NeuralNetwork`].
///
/// ```rust
/// use func_approx::{Activation, NetworkBuilder};
///
/// # fn main() -> func_approx::Result<()> {
/// let mut nn = NetworkBuilder::new(1)?
///     .add_layer(32, Activation::ReLU)?
///     .add_layer(1, Activation::Linear)?
///     .build_with_seed(0)?;
/// assert_eq!(nn.predict(&[0.5])?.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct NetworkBuilder {
    input_dim: usize,
    specs: Vec<LayerSpec>,
}

impl NetworkBuilder {
    /// Start building a network that accepts inputs of length `input_dim`.
    pub fn new(input_dim: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::Range("input_dim must be > 0".to_owned()));
        }
        Ok(Self {
            input_dim,
            specs: Vec::new(),
        })
    }

    /// Convenience constructor from a sizes list + activations.
    ///
    /// `sizes` includes input and output dimensions, so its length must be at least 2.
    /// `activations` must have length `sizes.len() - 1`.
    pub fn from_sizes(sizes: &[usize], activations: &[Activation]) -> Result<Self> {
        if sizes.len() < 2 {
            return Err(Error::Configuration(
                "sizes must include input and output dims".to_owned(),
            ));
        }
        if activations.len() != sizes.len() - 1 {
            return Err(Error::Configuration(format!(
                "activations length {} does not match sizes.len() - 1 ({})",
                activations.len(),
                sizes.len() - 1
            )));
        }

        let mut b = Self::new(sizes[0])?;
        for (&out_dim, &act) in sizes[1..].iter().zip(activations) {
            b = b.add_layer(out_dim, act)?;
        }
        Ok(b)
    }

    /// Add a dense layer with `out_dim` outputs, initialized with Xavier.
    pub fn add_layer(self, out_dim: usize, activation: Activation) -> Result<Self> {
        self.push(out_dim, activation, None)
    }

    pub fn add_layer_with_init(
        self,
        out_dim: usize,
        activation: Activation,
        init: Init,
    ) -> Result<Self> {
        self.push(out_dim, activation, Some(init))
    }

    fn push(mut self, out_dim: usize, activation: Activation, init: Option<Init>) -> Result<Self> {
        if out_dim == 0 {
            return Err(Error::Range("layer out_dim must be > 0".to_owned()));
        }
        activation.validate()?;

        let input_size = self
            .specs
            .last()
            .map_or(self.input_dim, |spec| spec.output_size);
        self.specs.push(LayerSpec {
            input_size,
            output_size: out_dim,
            activation,
            init,
        });
        Ok(self)
    }

    /// The layer specs collected so far.
    pub fn specs(&self) -> &[LayerSpec] {
        &self.specs
    }

    pub fn build_with_seed(self, seed: u64) -> Result<NeuralNetwork> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_with_rng(&mut rng)
    }

    pub fn build_with_rng<R: Rng + ?Sized>(self, rng: &mut R) -> Result<NeuralNetwork> {
        NeuralNetwork::from_specs(&self.specs, rng)
    }
}
