//! Sample storage and the train/validation split.
//!
//! `Samples` stores an `(input, target)` matrix pair as contiguous row-major
//! buffers. `Dataset` splits one `Samples` into a training and a validation
//! partition and owns the random source used to reshuffle the training rows.

use rand::Rng;

use crate::{Error, Result};

/// Parallel input (X) and target (Y) rows.
///
/// Stored as contiguous buffers with row-major layout:
/// - `inputs.len() == len * input_dim`
/// - `targets.len() == len * target_dim`
#[derive(Debug, Clone, PartialEq)]
pub struct Samples {
    inputs: Vec<f32>,
    targets: Vec<f32>,
    len: usize,
    input_dim: usize,
    target_dim: usize,
}

impl Samples {
    /// Build samples from flat buffers.
    ///
    /// `inputs` is `(len, input_dim)` and `targets` is `(len, target_dim)`.
    /// An empty pair of buffers is allowed.
    pub fn from_flat(
        inputs: Vec<f32>,
        targets: Vec<f32>,
        input_dim: usize,
        target_dim: usize,
    ) -> Result<Self> {
        if input_dim == 0 || target_dim == 0 {
            return Err(Error::DimensionMismatch(format!(
                "input_dim and target_dim must be > 0, got {input_dim} and {target_dim}"
            )));
        }
        if inputs.len() % input_dim != 0 {
            return Err(Error::DimensionMismatch(format!(
                "inputs length {} is not divisible by input_dim {input_dim}",
                inputs.len()
            )));
        }

        let len = inputs.len() / input_dim;
        if targets.len() != len * target_dim {
            return Err(Error::DimensionMismatch(format!(
                "targets length {} does not match len * target_dim ({len} * {target_dim})",
                targets.len()
            )));
        }

        Ok(Self {
            inputs,
            targets,
            len,
            input_dim,
            target_dim,
        })
    }

    /// Build samples from per-sample rows (copied into contiguous storage).
    ///
    /// Fails with `DimensionMismatch` if the row counts differ, if there are no
    /// rows, or if any row's width differs from the first row's.
    pub fn from_rows(inputs: &[Vec<f32>], targets: &[Vec<f32>]) -> Result<Self> {
        if inputs.len() != targets.len() {
            return Err(Error::DimensionMismatch(format!(
                "x and y must have the same number of rows: {} vs {}",
                inputs.len(),
                targets.len()
            )));
        }
        if inputs.is_empty() {
            return Err(Error::DimensionMismatch(
                "x and y must not be empty".to_owned(),
            ));
        }

        let input_dim = inputs[0].len();
        let target_dim = targets[0].len();
        let inputs = flatten(inputs, input_dim, "x")?;
        let targets = flatten(targets, target_dim, "y")?;
        Self::from_flat(inputs, targets, input_dim, target_dim)
    }

    /// One input and one target per sample.
    pub fn from_scalars(x: &[f32], y: &[f32]) -> Result<Self> {
        if x.len() != y.len() {
            return Err(Error::DimensionMismatch(format!(
                "x and y must have the same length: {} vs {}",
                x.len(),
                y.len()
            )));
        }
        if x.is_empty() {
            return Err(Error::DimensionMismatch(
                "x and y must not be empty".to_owned(),
            ));
        }
        Self::from_flat(x.to_vec(), y.to_vec(), 1, 1)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[inline]
    pub fn target_dim(&self) -> usize {
        self.target_dim
    }

    /// Returns the `idx`-th input row.
    ///
    /// Panics if `idx >= len`.
    #[inline]
    pub fn input(&self, idx: usize) -> &[f32] {
        let start = idx * self.input_dim;
        &self.inputs[start..start + self.input_dim]
    }

    /// Returns the `idx`-th target row.
    ///
    /// Panics if `idx >= len`.
    #[inline]
    pub fn target(&self, idx: usize) -> &[f32] {
        let start = idx * self.target_dim;
        &self.targets[start..start + self.target_dim]
    }

    /// All targets, flattened in row order.
    #[inline]
    pub fn targets(&self) -> &[f32] {
        &self.targets
    }

    /// Swap rows `a` and `b` of both matrices, keeping each input paired with its target.
    pub fn swap(&mut self, a: usize, b: usize) {
        swap_rows(&mut self.inputs, self.input_dim, a, b);
        swap_rows(&mut self.targets, self.target_dim, a, b);
    }

    /// Copy rows `[start, end)` into a new `Samples`.
    fn slice(&self, start: usize, end: usize) -> Self {
        Self {
            inputs: self.inputs[start * self.input_dim..end * self.input_dim].to_vec(),
            targets: self.targets[start * self.target_dim..end * self.target_dim].to_vec(),
            len: end - start,
            input_dim: self.input_dim,
            target_dim: self.target_dim,
        }
    }
}

fn flatten(rows: &[Vec<f32>], dim: usize, name: &str) -> Result<Vec<f32>> {
    let mut flat = Vec::with_capacity(rows.len() * dim);
    for (i, row) in rows.iter().enumerate() {
        if row.len() != dim {
            return Err(Error::DimensionMismatch(format!(
                "{name} row {i} has len {}, expected {dim}",
                row.len()
            )));
        }
        flat.extend_from_slice(row);
    }
    Ok(flat)
}

fn swap_rows(buf: &mut [f32], dim: usize, a: usize, b: usize) {
    if a == b {
        return;
    }
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    let (head, tail) = buf.split_at_mut(hi * dim);
    head[lo * dim..(lo + 1) * dim].swap_with_slice(&mut tail[..dim]);
}

/// Training and validation partitions plus the random source for shuffling.
///
/// The partitions are copied once at construction; shuffling only permutes the
/// training rows and never touches validation.
#[derive(Debug, Clone)]
pub struct Dataset<R> {
    train: Samples,
    validation: Samples,
    rng: R,
}

impl<R: Rng> Dataset<R> {
    /// Split rows `x`, `y` at `floor(n * (1 - split))`.
    ///
    /// Pass `&mut rng` to keep using the same random source afterwards.
    pub fn new(x: &[Vec<f32>], y: &[Vec<f32>], split: f64, rng: R) -> Result<Self> {
        Self::from_samples(Samples::from_rows(x, y)?, split, rng)
    }

    /// Split already-validated samples.
    ///
    /// Fails with `Range` if `split` is outside `[0, 1)` or if the training
    /// partition would be empty. An empty validation partition is allowed.
    pub fn from_samples(samples: Samples, split: f64, rng: R) -> Result<Self> {
        validate_split(split)?;

        let idx = split_index(samples.len(), split);
        if idx == 0 {
            return Err(Error::Range(format!(
                "split {split} leaves no training rows out of {}",
                samples.len()
            )));
        }

        Ok(Self {
            train: samples.slice(0, idx),
            validation: samples.slice(idx, samples.len()),
            rng,
        })
    }

    /// Fisher-Yates permutation of the training rows.
    pub fn shuffle(&mut self) {
        for i in (1..self.train.len()).rev() {
            let j = self.rng.gen_range(0..=i);
            self.train.swap(i, j);
        }
    }
}

impl<R> Dataset<R> {
    #[inline]
    pub fn train(&self) -> &Samples {
        &self.train
    }

    #[inline]
    pub fn validation(&self) -> &Samples {
        &self.validation
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.train.input_dim()
    }

    #[inline]
    pub fn target_dim(&self) -> usize {
        self.train.target_dim()
    }
}

/// Number of training rows for `len` samples and validation fraction `split`.
#[inline]
pub fn split_index(len: usize, split: f64) -> usize {
    (len as f64 * (1.0 - split)).floor() as usize
}

pub(crate) fn validate_split(split: f64) -> Result<()> {
    if !(split.is_finite() && (0.0..1.0).contains(&split)) {
        return Err(Error::Range(format!("split must be in [0,1), got {split}")));
    }
    Ok(())
}
