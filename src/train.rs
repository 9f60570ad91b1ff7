use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::data::validate_split;
use crate::network::not_set_up;
use crate::{Dataset, Error, NeuralNetwork, Result, Samples};

/// Epochs between verbose progress lines (epoch 1 is always logged).
pub const LOG_EVERY: usize = 100;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitConfig {
    /// Fraction of rows held out for validation, in `[0, 1)`.
    pub split: f64,
    pub epochs: usize,
    pub batch_size: usize,
    /// Log train/validation loss on epoch 1 and every 100th epoch.
    pub verbose: bool,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            split: 0.2,
            epochs: 1000,
            batch_size: 256,
            verbose: false,
        }
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<()> {
        validate_split(self.split)?;
        if self.epochs == 0 {
            return Err(Error::Range("epochs must be > 0".to_owned()));
        }
        validate_batch_size(self.batch_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitReport {
    pub epochs: usize,
    /// Loss over the training partition after the last epoch.
    pub train_loss: f32,
    /// Loss over the validation partition, or `None` if it is empty.
    pub val_loss: Option<f32>,
}

impl NeuralNetwork {
    /// Train on rows `xs`, `ys` for `cfg.epochs` epochs.
    ///
    /// Builds one [`Dataset`] (the random source shuffles its training rows)
    /// and calls [`NeuralNetwork::fit_next`] once per epoch.
    pub fn fit<R: Rng>(
        &mut self,
        xs: &[Vec<f32>],
        ys: &[Vec<f32>],
        cfg: &FitConfig,
        rng: R,
    ) -> Result<FitReport> {
        cfg.validate()?;
        let samples = Samples::from_rows(xs, ys)?;
        self.fit_samples(samples, cfg, rng)
    }

    /// [`NeuralNetwork::fit`] for scalar data: one input and one target per row.
    pub fn fit_scalars<R: Rng>(
        &mut self,
        x: &[f32],
        y: &[f32],
        cfg: &FitConfig,
        rng: R,
    ) -> Result<FitReport> {
        cfg.validate()?;
        let samples = Samples::from_scalars(x, y)?;
        self.fit_samples(samples, cfg, rng)
    }

    fn fit_samples<R: Rng>(
        &mut self,
        samples: Samples,
        cfg: &FitConfig,
        rng: R,
    ) -> Result<FitReport> {
        if !self.has_trainer() {
            return Err(not_set_up());
        }
        let mut dataset = Dataset::from_samples(samples, cfg.split, rng)?;

        for epoch in 1..=cfg.epochs {
            self.fit_next(&mut dataset, cfg.batch_size)?;

            if cfg.verbose && should_log(epoch) {
                // val_loss is measured on the validation rows, not the training
                // rows; with no validation rows the training loss stands in.
                let (train_loss, val_loss) = self.dataset_losses(&dataset)?;
                log::info!(
                    "epoch {epoch}/{} - loss: {train_loss} - val_loss: {}",
                    cfg.epochs,
                    val_loss.unwrap_or(train_loss)
                );
            }
        }

        let (train_loss, val_loss) = self.dataset_losses(&dataset)?;
        Ok(FitReport {
            epochs: cfg.epochs,
            train_loss,
            val_loss,
        })
    }

    /// Advance training by exactly one epoch.
    ///
    /// Shuffles the training partition, then walks it in contiguous batches of
    /// `batch_size` (the last may be smaller). Every sample is predicted and
    /// learned; each batch ends with one trainer step.
    pub fn fit_next<R: Rng>(&mut self, dataset: &mut Dataset<R>, batch_size: usize) -> Result<()> {
        validate_batch_size(batch_size)?;
        self.check_samples(dataset.train())?;
        if !self.has_trainer() {
            return Err(not_set_up());
        }

        dataset.shuffle();
        let train = dataset.train();

        let mut batches = 0usize;
        for start in (0..train.len()).step_by(batch_size) {
            let end = (start + batch_size).min(train.len());
            if let Err(err) = self.train_batch(train, start, end) {
                // Leave no half-accumulated batch behind.
                if let Ok((_, trainer)) = self.layers_and_trainer() {
                    trainer.reset();
                }
                return Err(err);
            }
            batches += 1;
        }

        log::trace!("epoch done: {} samples in {batches} batches", train.len());
        Ok(())
    }

    fn train_batch(&mut self, train: &Samples, start: usize, end: usize) -> Result<()> {
        for idx in start..end {
            let (input, target) = (train.input(idx), train.target(idx));
            self.predict(input)?;

            let (layers, trainer) = self.layers_and_trainer()?;
            trainer.learn(layers, input, target)?;
        }

        let (layers, trainer) = self.layers_and_trainer()?;
        trainer.step(layers)
    }

    /// Loss of the bound loss function over every row of `samples`.
    ///
    /// Predictions and targets are flattened before the loss is applied, so
    /// MSE averages over all output elements. Zero rows give `0.0`.
    pub fn calculate_loss(&mut self, samples: &Samples) -> Result<f32> {
        let loss = self.loss().ok_or_else(not_set_up)?;
        if samples.is_empty() {
            return Ok(0.0);
        }
        self.check_samples(samples)?;

        let mut predictions = Vec::with_capacity(samples.len() * self.output_dim());
        for idx in 0..samples.len() {
            predictions.extend(self.predict(samples.input(idx))?);
        }
        loss.loss(&predictions, samples.targets())
    }

    /// Current `(train, validation)` losses; validation is `None` when empty.
    pub fn dataset_losses<R>(&mut self, dataset: &Dataset<R>) -> Result<(f32, Option<f32>)> {
        let train = self.calculate_loss(dataset.train())?;
        let val = if dataset.validation().is_empty() {
            None
        } else {
            Some(self.calculate_loss(dataset.validation())?)
        };
        Ok((train, val))
    }

    fn check_samples(&self, samples: &Samples) -> Result<()> {
        if samples.input_dim() != self.input_dim() {
            return Err(Error::DimensionMismatch(format!(
                "samples input_dim {} does not match network input_dim {}",
                samples.input_dim(),
                self.input_dim()
            )));
        }
        if samples.target_dim() != self.output_dim() {
            return Err(Error::DimensionMismatch(format!(
                "samples target_dim {} does not match network output_dim {}",
                samples.target_dim(),
                self.output_dim()
            )));
        }
        Ok(())
    }
}

/// Verbose `fit` logs epoch 1 and every [`LOG_EVERY`]th epoch.
fn should_log(epoch: usize) -> bool {
    epoch == 1 || epoch % LOG_EVERY == 0
}

fn validate_batch_size(batch_size: usize) -> Result<()> {
    if batch_size == 0 {
        return Err(Error::Range("batch_size must be > 0".to_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::{Activation, Layer, Loss, Optimizer, Trainable};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn relu_2x2() -> NeuralNetwork {
        let layer = Layer::from_parts(
            2,
            2,
            Activation::ReLU,
            vec![1.0, 0.5, 2.0, 2.5],
            vec![0.0, 0.0],
        )
        .unwrap();
        NeuralNetwork::new(vec![layer]).unwrap()
    }

    fn with_sgd(mut nn: NeuralNetwork, lr: f32) -> NeuralNetwork {
        let trainer = Optimizer::Sgd { lr }.build(&nn).unwrap();
        nn.setup(trainer, Loss::Mse);
        nn
    }

    #[test]
    fn fit_config_defaults_match_reference_service() {
        let cfg = FitConfig::default();
        assert_eq!(cfg.split, 0.2);
        assert_eq!(cfg.epochs, 1000);
        assert_eq!(cfg.batch_size, 256);
        assert!(!cfg.verbose);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn fit_single_sample_single_epoch() {
        let mut nn = with_sgd(relu_2x2(), 1.0);
        let cfg = FitConfig {
            split: 0.0,
            epochs: 1,
            batch_size: 1,
            verbose: false,
        };

        let report = nn
            .fit(
                &[vec![0.5, 1.0]],
                &[vec![1.0, 0.5]],
                &cfg,
                StdRng::seed_from_u64(0),
            )
            .unwrap();

        assert_eq!(nn.predict(&[0.5, 1.0]).unwrap(), vec![1.0, 0.0]);
        assert_eq!(report.epochs, 1);
        assert_eq!(report.val_loss, None);
        // mean of 0.5 * [0^2, 0.5^2]
        assert_eq!(report.train_loss, 0.0625);
    }

    #[test]
    fn fit_checks_ranges_before_shapes_before_setup() {
        let mut nn = relu_2x2();
        let x = vec![vec![0.5, 1.0]];
        let y = vec![vec![1.0, 0.5]];
        let rng = || StdRng::seed_from_u64(0);

        let bad_split = FitConfig {
            split: 1.0,
            ..FitConfig::default()
        };
        assert!(matches!(
            nn.fit(&x, &y, &bad_split, rng()),
            Err(Error::Range(_))
        ));

        let zero_epochs = FitConfig {
            epochs: 0,
            ..FitConfig::default()
        };
        assert!(matches!(
            nn.fit(&x, &y, &zero_epochs, rng()),
            Err(Error::Range(_))
        ));

        let zero_batch = FitConfig {
            batch_size: 0,
            ..FitConfig::default()
        };
        assert!(matches!(
            nn.fit(&x, &y, &zero_batch, rng()),
            Err(Error::Range(_))
        ));

        let cfg = FitConfig {
            split: 0.0,
            ..FitConfig::default()
        };
        assert!(matches!(
            nn.fit(&x, &[], &cfg, rng()),
            Err(Error::DimensionMismatch(_))
        ));
        assert!(matches!(
            nn.fit(&[], &[], &cfg, rng()),
            Err(Error::DimensionMismatch(_))
        ));

        assert!(matches!(
            nn.fit(&x, &y, &cfg, rng()),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn fit_next_requires_setup_and_matching_shapes() {
        let mut nn = relu_2x2();
        let mut ds = Dataset::new(
            &[vec![0.5, 1.0]],
            &[vec![1.0, 0.5]],
            0.0,
            StdRng::seed_from_u64(0),
        )
        .unwrap();
        assert!(matches!(
            nn.fit_next(&mut ds, 1),
            Err(Error::Configuration(_))
        ));

        let mut nn = with_sgd(nn, 1.0);
        assert!(matches!(nn.fit_next(&mut ds, 0), Err(Error::Range(_))));

        let mut narrow = Dataset::new(&[vec![0.5]], &[vec![1.0]], 0.0, StdRng::seed_from_u64(0))
            .unwrap();
        assert!(matches!(
            nn.fit_next(&mut narrow, 1),
            Err(Error::DimensionMismatch(_))
        ));
    }

    #[test]
    fn one_epoch_takes_one_step_per_batch() {
        let layer = Layer::from_parts(1, 1, Activation::Linear, vec![0.0], vec![0.0]).unwrap();
        let mut nn = NeuralNetwork::new(vec![layer]).unwrap();
        let trainer = Optimizer::default().build(&nn).unwrap();
        nn.setup(trainer, Loss::Mse);

        let x: Vec<Vec<f32>> = (0..5).map(|i| vec![i as f32 + 1.0]).collect();
        let y: Vec<Vec<f32>> = x.iter().map(|r| vec![r[0] * 3.0]).collect();
        let mut ds = Dataset::new(&x, &y, 0.0, StdRng::seed_from_u64(1)).unwrap();

        nn.fit_next(&mut ds, 2).unwrap();

        // Three batches (2 + 2 + 1); Adam moves w by at most lr per step.
        let w = nn.layers()[0].weights()[0];
        assert!(w > 1e-3 && w <= 3e-3 + 1e-6, "w = {w}");
        assert_eq!(nn.trainer().map(|t| t.pending()), Some(0));
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Call {
        /// `(input, target, output cached by the forward pass)`
        Learn(f32, f32, f32),
        Step,
    }

    /// Trainer that only records how the training loop drives it.
    #[derive(Debug, Default)]
    struct Recorder {
        calls: Rc<RefCell<Vec<Call>>>,
    }

    impl Trainable for Recorder {
        fn set_loss(&mut self, _loss: Loss) {}

        fn learn(&mut self, layers: &[Layer], input: &[f32], expected: &[f32]) -> Result<()> {
            let cached = layers[layers.len() - 1].output()[0];
            self.calls
                .borrow_mut()
                .push(Call::Learn(input[0], expected[0], cached));
            Ok(())
        }

        fn step(&mut self, _layers: &mut [Layer]) -> Result<()> {
            self.calls.borrow_mut().push(Call::Step);
            Ok(())
        }

        fn reset(&mut self) {}

        fn pending(&self) -> usize {
            0
        }
    }

    #[test]
    fn fit_next_visits_each_shuffled_row_once_in_order() {
        // Identity layer, so the cached output equals the input just predicted.
        let layer = Layer::from_parts(1, 1, Activation::Linear, vec![1.0], vec![0.0]).unwrap();
        let mut nn = NeuralNetwork::new(vec![layer]).unwrap();
        let recorder = Recorder::default();
        let calls = Rc::clone(&recorder.calls);
        nn.setup(Box::new(recorder), Loss::Mse);

        let x: Vec<Vec<f32>> = (0..12).map(|i| vec![i as f32]).collect();
        let y: Vec<Vec<f32>> = x.iter().map(|r| vec![10.0 * r[0]]).collect();
        let mut ds = Dataset::new(&x, &y, 0.0, StdRng::seed_from_u64(9)).unwrap();
        let mut twin = Dataset::new(&x, &y, 0.0, StdRng::seed_from_u64(9)).unwrap();
        twin.shuffle();

        nn.fit_next(&mut ds, 5).unwrap();

        // The epoch trains on exactly the once-shuffled order.
        assert_eq!(ds.train(), twin.train());
        let order: Vec<f32> = (0..12).map(|i| twin.train().input(i)[0]).collect();
        let original: Vec<f32> = (0..12).map(|i| i as f32).collect();
        assert_ne!(order, original);

        // Batches of 5, 5 and 2, each closed by one step.
        let mut expected = Vec::new();
        for (i, &v) in order.iter().enumerate() {
            expected.push(Call::Learn(v, 10.0 * v, v));
            if i % 5 == 4 || i == order.len() - 1 {
                expected.push(Call::Step);
            }
        }
        assert_eq!(*calls.borrow(), expected);

        let mut learned: Vec<f32> = calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Learn(x, _, _) => Some(*x),
                Call::Step => None,
            })
            .collect();
        learned.sort_by(f32::total_cmp);
        assert_eq!(learned, original);
        assert_eq!(calls.borrow().iter().filter(|c| **c == Call::Step).count(), 3);
    }

    #[test]
    fn dataset_losses_measure_each_partition() {
        let layer = Layer::from_parts(1, 1, Activation::Linear, vec![1.0], vec![0.0]).unwrap();
        let mut nn = with_sgd(NeuralNetwork::new(vec![layer]).unwrap(), 0.1);

        // Training rows fit exactly; the held-out row is off by 2.
        let x = [vec![1.0], vec![2.0], vec![3.0], vec![4.0]];
        let y = [vec![1.0], vec![2.0], vec![3.0], vec![6.0]];
        let ds = Dataset::new(&x, &y, 0.25, StdRng::seed_from_u64(0)).unwrap();

        let (train, val) = nn.dataset_losses(&ds).unwrap();
        assert_eq!(train, 0.0);
        assert_eq!(val, Some(2.0));
    }

    #[test]
    fn verbose_cadence_is_first_epoch_then_every_hundredth() {
        let logged: Vec<usize> = (1..=350).filter(|&e| should_log(e)).collect();
        assert_eq!(logged, vec![1, 100, 200, 300]);
    }

    #[test]
    fn calculate_loss_flattens_outputs() {
        let mut nn = with_sgd(relu_2x2(), 1.0);
        let samples =
            Samples::from_rows(&[vec![0.5, 1.0], vec![0.0, 0.0]], &[vec![1.0, 0.5], vec![0.0, 1.0]])
                .unwrap();

        // Predictions [1.0, 3.5] and [0.0, 0.0]; squared errors 0, 9, 0, 1.
        let loss = nn.calculate_loss(&samples).unwrap();
        assert!((loss - 0.5 * 10.0 / 4.0).abs() < 1e-6);
    }

    #[test]
    fn calculate_loss_needs_a_loss() {
        let mut nn = relu_2x2();
        let samples = Samples::from_rows(&[vec![0.5, 1.0]], &[vec![1.0, 0.5]]).unwrap();
        assert!(matches!(
            nn.calculate_loss(&samples),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn fit_reduces_loss_on_a_line() {
        let layer = Layer::from_parts(1, 1, Activation::Linear, vec![0.0], vec![0.0]).unwrap();
        let mut nn = NeuralNetwork::new(vec![layer]).unwrap();
        let trainer = Optimizer::Sgd { lr: 0.1 }.build(&nn).unwrap();
        nn.setup(trainer, Loss::Mse);

        let x: Vec<f32> = (0..20).map(|i| i as f32 / 10.0 - 1.0).collect();
        let y: Vec<f32> = x.iter().map(|v| 2.0 * v + 0.5).collect();
        let cfg = FitConfig {
            split: 0.2,
            epochs: 200,
            batch_size: 4,
            verbose: true,
        };

        let report = nn
            .fit_scalars(&x, &y, &cfg, StdRng::seed_from_u64(42))
            .unwrap();
        assert!(report.train_loss < 1e-3, "train loss {}", report.train_loss);
        assert!(report.val_loss.is_some_and(|v| v < 1e-2));
    }
}
