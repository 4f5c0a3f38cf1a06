use dfdx::{optim::Adam, prelude::*, tensor::Gradients};
use tracing::debug;

use super::{Batch, FeatureVector, INPUT_DIMENSION, NUM_PITCH_CLASSES};
use crate::error::{Error, Result};

/// 8 → 250 → 175 → 150 → 7. The last layer emits logits; softmax is applied on read.
pub type PitchMlp = (
  (Linear<INPUT_DIMENSION, 250>, ReLU),
  (Linear<250, 175>, ReLU),
  (Linear<175, 150>, ReLU),
  Linear<150, NUM_PITCH_CLASSES>,
);

pub type PitchNetwork = <PitchMlp as BuildOnDevice<Cpu, f32>>::Built;

/// The network together with its optimizer state.
pub struct PitchClassifier {
  dev: Cpu,
  model: PitchNetwork,
  opt: Adam<PitchNetwork, f32, Cpu>,
  grads: Option<Gradients<f32, Cpu>>,
  loss_avg: ExponentialAverage,
  steps: usize,
}

impl PitchClassifier {
  /// Fresh parameters. A seed makes initialization (and hence the whole run) reproducible.
  pub fn new(seed: Option<u64>) -> Self {
    let dev = seed.map_or_else(Cpu::default, Cpu::seed_from_u64);
    let model = dev.build_module::<PitchMlp, f32>();
    let opt = Adam::new(&model, AdamConfig::default());
    Self {
      dev,
      model,
      opt,
      grads: None,
      loss_avg: ExponentialAverage::new(0.0),
      steps: 0,
    }
  }

  /// One Adam step on cross-entropy between the predicted distribution and the labels.
  /// Returns the batch loss.
  pub fn train_step(&mut self, batch: &Batch) -> Result<f32> {
    if batch.is_empty() {
      return Ok(0.0);
    }
    let rows = batch.len();
    let x = self.dev.tensor_from_vec(batch.flat_features(), (rows, Const::<INPUT_DIMENSION>));
    let y = self.dev.tensor_from_vec(batch.one_hot_labels(), (rows, Const::<NUM_PITCH_CLASSES>));

    let grads = self.grads.take().unwrap_or_else(|| self.model.alloc_grads());
    let logits = self.model.forward_mut(x.traced(grads));
    let loss = cross_entropy_with_logits_loss(logits, y);
    let loss_value = loss.array();
    let mut grads = loss.backward();
    self
      .opt
      .update(&mut self.model, &grads)
      .map_err(|err| Error::Optimizer(format!("{:?}", err)))?;
    self.model.zero_grads(&mut grads);
    self.grads = Some(grads);

    self.steps += 1;
    self.loss_avg.update(loss_value);
    debug!(step = self.steps, loss = loss_value, "train step");
    Ok(loss_value)
  }

  /// Class probabilities for every row, concatenated row-major (`rows × NUM_PITCH_CLASSES`).
  pub fn predict(&self, features: &[FeatureVector]) -> Vec<f32> {
    if features.is_empty() {
      return Vec::new();
    }
    let flat = features.iter().flatten().copied().collect();
    let x = self.dev.tensor_from_vec(flat, (features.len(), Const::<INPUT_DIMENSION>));
    self.model.forward(x).softmax::<Axis<1>>().as_vec()
  }

  pub fn steps(&self) -> usize {
    self.steps
  }

  /// Smoothed loss since the last call, then starts a new average.
  pub fn take_running_loss(&mut self) -> f32 {
    let value = self.loss_avg.value;
    self.loss_avg.reset();
    value
  }
}

impl std::fmt::Debug for PitchClassifier {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PitchClassifier")
      .field("steps", &self.steps)
      .field("running_loss", &self.loss_avg.value)
      .finish()
  }
}

/// Bias-corrected exponential moving average.
#[derive(Debug, Clone)]
pub struct ExponentialAverage {
  beta: f32,
  moment: f32,
  pub value: f32,
  t: i32,
}

impl ExponentialAverage {
  pub fn new(initial: f32) -> Self {
    ExponentialAverage {
      beta: 0.98,
      moment: 0.,
      value: initial,
      t: 0,
    }
  }

  pub fn update(&mut self, value: f32) {
    self.t += 1;
    self.moment = self.beta * self.moment + (1. - self.beta) * value;
    // bias correction
    self.value = self.moment / (1. - f32::powi(self.beta, self.t));
  }

  pub fn reset(&mut self) {
    self.moment = 0.;
    self.value = 0.0;
    self.t = 0;
  }
}
