use std::collections::BTreeMap;

use serde::Serialize;

/// Number of values in a feature vector: 6 physics measurements, start speed, handedness.
pub const INPUT_DIMENSION: usize = 8;
pub const NUM_PITCH_CLASSES: usize = 7;

pub type FeatureVector = [f32; INPUT_DIMENSION];

/// Class code in `0..NUM_PITCH_CLASSES`, checked when the row is loaded.
pub type Label = usize;

/// Rows handed to one forward (and, when training, backward) pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
  pub features: Vec<FeatureVector>,
  pub labels: Vec<Label>,
}

impl Batch {
  pub fn len(&self) -> usize {
    self.features.len()
  }

  pub fn is_empty(&self) -> bool {
    self.features.is_empty()
  }

  /// Row-major `len × INPUT_DIMENSION` buffer.
  pub fn flat_features(&self) -> Vec<f32> {
    self.features.iter().flatten().copied().collect()
  }

  /// Row-major `len × NUM_PITCH_CLASSES` one-hot targets.
  pub fn one_hot_labels(&self) -> Vec<f32> {
    let mut targets = vec![0.0; self.len() * NUM_PITCH_CLASSES];
    for (row, &label) in self.labels.iter().enumerate() {
      targets[row * NUM_PITCH_CLASSES + label] = 1.0;
    }
    targets
  }
}

/// Mean probability assigned to the true class, per data split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassAccuracy {
  pub training: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub validation: Option<f32>,
}

/// Keyed by pitch label. Rebuilt on every evaluation.
pub type EvaluationResult = BTreeMap<&'static str, ClassAccuracy>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_one_hot_labels() {
    let batch = Batch {
      features: vec![[0.0; INPUT_DIMENSION]; 2],
      labels: vec![3, 6],
    };
    let targets = batch.one_hot_labels();
    assert_eq!(targets.len(), 2 * NUM_PITCH_CLASSES);
    assert_eq!(targets[3], 1.0);
    assert_eq!(targets[NUM_PITCH_CLASSES + 6], 1.0);
    assert_eq!(targets.iter().sum::<f32>(), 2.0);
  }

  #[test]
  fn test_flat_features_row_major() {
    let mut first = [0.0; INPUT_DIMENSION];
    first[7] = 1.0;
    let mut second = [0.5; INPUT_DIMENSION];
    second[0] = 2.0;
    let batch = Batch {
      features: vec![first, second],
      labels: vec![0, 1],
    };
    let flat = batch.flat_features();
    assert_eq!(flat.len(), 16);
    assert_eq!(flat[7], 1.0);
    assert_eq!(flat[8], 2.0);
  }

  #[test]
  fn test_training_only_accuracy_omits_validation() {
    let accuracy = ClassAccuracy {
      training: 0.5,
      validation: None,
    };
    let json = serde_json::to_string(&accuracy).unwrap();
    assert_eq!(json, r#"{"training":0.5}"#);
  }
}
