//! A small feed-forward network trainer for approximating functions.
//!
//! `func-approx` is a from-scratch implementation of dense networks trained by
//! backpropagation with mini-batch SGD or Adam. It is built for fitting a
//! scalar function from sampled `(x, y)` pairs and reporting progress between
//! epochs.
//!
//! # Training flow
//!
//! [`NeuralNetwork::fit`] builds one [`Dataset`] and calls
//! [`NeuralNetwork::fit_next`] once per epoch. Each epoch reshuffles the
//! training partition and walks it in mini-batches. For every sample,
//! `predict` fills each [`Layer`]'s `z`/`a` cache and the bound [`Trainable`]
//! backpropagates through those caches into its [`Gradients`]. At the end of a
//! batch, `step` applies the batch-averaged gradient to every layer and clears
//! the accumulator.
//!
//! # Data layout and shapes
//!
//! - Scalars are `f32`; the validation split fraction is `f64`.
//! - Layer weights are row-major with shape `(out_dim, in_dim)`.
//! - [`Samples`] stores inputs and targets contiguously in row-major layout.
//!
//! # Errors
//!
//! Every fallible call returns [`Result`] and checks shapes before mutating, so
//! a failed call never leaves a half-updated network behind.
//!
//! # Random sources
//!
//! The crate never creates its own randomness outside
//! [`NetworkBuilder::build_with_seed`]: initializers and the dataset shuffle use
//! the caller's [`rand::Rng`], so a fixed seed gives a reproducible run.
//!
//! # Quick start
//!
//! ```rust
//! use func_approx::{Activation, FitConfig, Loss, NetworkBuilder, Optimizer};
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! # fn main() -> func_approx::Result<()> {
//! let xs: Vec<f32> = (0..64).map(|i| i as f32 / 32.0 - 1.0).collect();
//! let ys: Vec<f32> = xs.iter().map(|x| x * x).collect();
//!
//! let mut nn = NetworkBuilder::new(1)?
//!     .add_layer(16, Activation::ReLU)?
//!     .add_layer(1, Activation::Linear)?
//!     .build_with_seed(0)?;
//! let trainer = Optimizer::default().build(&nn)?;
//! nn.setup(trainer, Loss::Mse);
//!
//! let cfg = FitConfig {
//!     epochs: 50,
//!     batch_size: 8,
//!     ..FitConfig::default()
//! };
//! let report = nn.fit_scalars(&xs, &ys, &cfg, StdRng::seed_from_u64(0))?;
//! assert!(report.train_loss.is_finite());
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod backprop;
pub mod builder;
pub mod config;
pub mod data;
pub mod error;
pub mod gradients;
pub mod init;
pub mod layer;
pub mod loss;
pub mod network;
pub mod optim;
pub mod session;
pub mod train;

pub use activation::Activation;
pub use backprop::Backpropagation;
pub use builder::{LayerSpec, NetworkBuilder};
#[cfg(feature = "serde")]
pub use config::load_config;
pub use config::SessionConfig;
pub use data::{Dataset, Samples};
pub use error::{Error, Result};
pub use gradients::Gradients;
pub use init::Init;
pub use layer::Layer;
pub use loss::Loss;
pub use network::NeuralNetwork;
pub use optim::{Adam, Optimizer, Sgd, Trainable};
pub use session::{Session, Snapshot};
pub use train::{FitConfig, FitReport};
