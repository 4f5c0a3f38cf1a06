//! The fixed-length training loop and the model handle it shares with the server.

use std::{io, sync::Arc, thread, time::Duration};

use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

use crate::{
  error::{Error, Result},
  model::{self, EvaluationResult, PitchClassifier, PitchDatasets, TRAINING_BATCH_SIZE},
};

pub const NUM_TRAINING_EPOCHS: usize = 10;
pub const TIMEOUT_BETWEEN_EPOCHS: Duration = Duration::from_millis(500);

/// `Idle → TrainingEpoch(0) → … → TrainingEpoch(NUM_TRAINING_EPOCHS - 1) → Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "epoch", rename_all = "camelCase")]
pub enum TrainingState {
  Idle,
  TrainingEpoch(usize),
  Complete,
}

impl TrainingState {
  pub fn next(self) -> Self {
    match self {
      TrainingState::Idle => TrainingState::TrainingEpoch(0),
      TrainingState::TrainingEpoch(epoch) if epoch + 1 < NUM_TRAINING_EPOCHS => {
        TrainingState::TrainingEpoch(epoch + 1)
      }
      TrainingState::TrainingEpoch(_) | TrainingState::Complete => TrainingState::Complete,
    }
  }

  pub fn is_complete(self) -> bool {
    self == TrainingState::Complete
  }
}

type Job = Box<dyn FnOnce(&mut PitchClassifier) + Send>;

/// Handle to the one model instance, shared by the training loop and prediction requests.
///
/// The classifier lives on its own thread and runs jobs one at a time in arrival order.
/// Training submits one job per batch step, so a prediction sees the parameters as of
/// the last finished step and may lag the training loop by that much.
#[derive(Debug, Clone)]
pub struct SharedClassifier {
  jobs: mpsc::UnboundedSender<Job>,
}

impl SharedClassifier {
  /// Starts the worker thread. It exits once every handle is dropped.
  pub fn spawn(seed: Option<u64>) -> io::Result<Self> {
    let (jobs, mut queue) = mpsc::unbounded_channel::<Job>();
    thread::Builder::new()
      .name("pitch-model".to_owned())
      .spawn(move || {
        let mut classifier = PitchClassifier::new(seed);
        while let Some(job) = queue.blocking_recv() {
          job(&mut classifier);
        }
        debug!("model worker finished after {} steps", classifier.steps());
      })?;
    Ok(Self { jobs })
  }

  /// Runs `f` against the current parameters once the jobs queued before it are done.
  pub async fn with<R, F>(&self, f: F) -> Result<R>
  where
    F: FnOnce(&mut PitchClassifier) -> R + Send + 'static,
    R: Send + 'static,
  {
    let (reply, response) = oneshot::channel();
    self
      .jobs
      .send(Box::new(move |classifier: &mut PitchClassifier| {
        // the caller may have gone away; nothing to do then
        let _ = reply.send(f(classifier));
      }))
      .map_err(|_| Error::ModelStopped)?;
    response.await.map_err(|_| Error::ModelStopped)
  }

  pub async fn predict_sample(&self, sample: Vec<f32>) -> Result<&'static str> {
    self.with(move |classifier| model::predict_sample(classifier, &sample)).await?
  }
}

pub struct Trainer {
  classifier: SharedClassifier,
  datasets: Arc<PitchDatasets>,
  report_validation: bool,
  epoch_delay: Duration,
  rng: StdRng,
  state: watch::Sender<TrainingState>,
}

impl Trainer {
  pub fn new(classifier: SharedClassifier, datasets: Arc<PitchDatasets>, seed: Option<u64>) -> Self {
    let (state, _) = watch::channel(TrainingState::Idle);
    Self {
      classifier,
      datasets,
      report_validation: false,
      epoch_delay: TIMEOUT_BETWEEN_EPOCHS,
      rng: seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64),
      state,
    }
  }

  /// Also evaluate the test data after every epoch.
  pub fn report_validation(mut self, report_validation: bool) -> Self {
    self.report_validation = report_validation;
    self
  }

  pub fn epoch_delay(mut self, epoch_delay: Duration) -> Self {
    self.epoch_delay = epoch_delay;
    self
  }

  pub fn subscribe(&self) -> watch::Receiver<TrainingState> {
    self.state.subscribe()
  }

  pub fn state(&self) -> TrainingState {
    *self.state.borrow()
  }

  /// Runs every epoch, then returns the evaluation from the last one.
  pub async fn run(&mut self) -> Result<EvaluationResult> {
    let mut result = EvaluationResult::new();
    let mut state = TrainingState::Idle.next();
    while let TrainingState::TrainingEpoch(epoch) = state {
      self.state.send_replace(state);
      info!("Training iteration : {} / {}", epoch + 1, NUM_TRAINING_EPOCHS);

      let running_loss = self.run_epoch().await?;
      info!(epoch = epoch + 1, loss = running_loss, "epoch finished");
      result = self.evaluate(self.report_validation).await?;
      info!("accuracyPerClass {}", model::accuracy_json(&result));

      tokio::time::sleep(self.epoch_delay).await;
      state = state.next();
    }
    self.state.send_replace(state);
    Ok(result)
  }

  /// One shuffled pass over the training data. Returns the smoothed epoch loss.
  async fn run_epoch(&mut self) -> Result<f32> {
    for batch in self.datasets.training.shuffled_batches(TRAINING_BATCH_SIZE, &mut self.rng) {
      self.classifier.with(move |classifier| classifier.train_step(&batch)).await??;
    }
    self.classifier.with(PitchClassifier::take_running_loss).await
  }

  /// Per-class accuracy on the training data, plus the test data when asked.
  pub async fn evaluate(&self, use_test_data: bool) -> Result<EvaluationResult> {
    let datasets = Arc::clone(&self.datasets);
    self
      .classifier
      .with(move |classifier| {
        let test = if use_test_data { Some(&datasets.test) } else { None };
        model::evaluate(classifier, &datasets.training, test)
      })
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{dataset::synthetic_csv, Dataset, INPUT_DIMENSION, NUM_PITCH_CLASSES};

  fn tiny_datasets() -> Arc<PitchDatasets> {
    let training = Dataset::from_reader(synthetic_csv(10).as_bytes()).unwrap();
    let test = Dataset::from_reader(synthetic_csv(2).as_bytes()).unwrap();
    Arc::new(PitchDatasets::new(training, test))
  }

  #[test]
  fn test_state_machine_walk() {
    let mut state = TrainingState::Idle;
    let mut epochs = Vec::new();
    for _ in 0..NUM_TRAINING_EPOCHS {
      state = state.next();
      match state {
        TrainingState::TrainingEpoch(epoch) => epochs.push(epoch),
        other => panic!("unexpected state {:?}", other),
      }
    }
    assert_eq!(epochs, (0..NUM_TRAINING_EPOCHS).collect::<Vec<_>>());
    state = state.next();
    assert!(state.is_complete());
    assert_eq!(state.next(), TrainingState::Complete);
  }

  #[test]
  fn test_state_serialization() {
    let json = |state| serde_json::to_string(&state).unwrap();
    assert_eq!(json(TrainingState::Idle), r#"{"state":"idle"}"#);
    assert_eq!(json(TrainingState::TrainingEpoch(3)), r#"{"state":"trainingEpoch","epoch":3}"#);
    assert_eq!(json(TrainingState::Complete), r#"{"state":"complete"}"#);
  }

  #[tokio::test]
  async fn test_evaluate_without_test_data() {
    let classifier = SharedClassifier::spawn(Some(1)).unwrap();
    let trainer = Trainer::new(classifier, tiny_datasets(), Some(1));
    let result = trainer.evaluate(false).await.unwrap();
    assert_eq!(result.len(), NUM_PITCH_CLASSES);
    assert!(result.values().all(|accuracy| accuracy.validation.is_none()));
  }

  #[tokio::test]
  async fn test_run_reaches_complete() {
    let scope = crate::utils::init_logging_tests();
    let classifier = SharedClassifier::spawn(Some(2)).unwrap();
    let mut trainer = Trainer::new(classifier.clone(), tiny_datasets(), Some(2))
      .report_validation(true)
      .epoch_delay(Duration::ZERO);
    let state = trainer.subscribe();
    assert_eq!(trainer.state(), TrainingState::Idle);

    let result = trainer.run().await.unwrap();

    assert!(state.borrow().is_complete());
    assert!(trainer.state().is_complete());
    assert_eq!(result.len(), NUM_PITCH_CLASSES);
    assert!(result.values().all(|accuracy| accuracy.validation.is_some()));
    // 70 rows fit in one batch per epoch
    let steps = classifier.with(|classifier| classifier.steps()).await.unwrap();
    assert_eq!(steps, NUM_TRAINING_EPOCHS);
    drop(scope);
  }

  #[tokio::test]
  async fn test_predictions_see_latest_step() {
    let batch = Dataset::from_reader(synthetic_csv(10).as_bytes()).unwrap().validation_batch();
    let shared = SharedClassifier::spawn(Some(4)).unwrap();
    let sample = [0.5; INPUT_DIMENSION];

    let before = shared.with(move |classifier| classifier.predict(&[sample])).await.unwrap();
    shared.with(move |classifier| classifier.train_step(&batch)).await.unwrap().unwrap();
    let after = shared.with(move |classifier| classifier.predict(&[sample])).await.unwrap();

    assert_ne!(before, after);
    assert!(shared.predict_sample(sample.to_vec()).await.is_ok());
  }

  #[tokio::test]
  async fn test_shape_errors_reach_the_caller() {
    let shared = SharedClassifier::spawn(Some(4)).unwrap();
    let err = shared.predict_sample(vec![0.5; 9]).await.unwrap_err();
    assert!(matches!(err, Error::Shape { expected: 8, actual: 9 }));
  }
}
