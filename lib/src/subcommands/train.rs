use std::sync::Arc;

use tracing::info;

use crate::{
  error::Result,
  model::{accuracy_json, EvaluationResult, PitchDatasets},
  training::{SharedClassifier, Trainer},
};

/// Runs the training loop with no server attached, then evaluates on both data files.
pub struct Train {
  datasets: Arc<PitchDatasets>,
  report_validation: bool,
  seed: Option<u64>,
}

impl Train {
  pub fn new(datasets: PitchDatasets, report_validation: bool, seed: Option<u64>) -> Self {
    Self {
      datasets: Arc::new(datasets),
      report_validation,
      seed,
    }
  }

  pub async fn run(self) -> Result<EvaluationResult> {
    let classifier = SharedClassifier::spawn(self.seed)?;
    let mut trainer =
      Trainer::new(classifier, self.datasets, self.seed).report_validation(self.report_validation);
    trainer.run().await?;
    let result = trainer.evaluate(true).await?;
    info!("Final accuracyPerClass {}", accuracy_json(&result));
    Ok(result)
  }
}
