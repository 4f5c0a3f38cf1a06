use std::convert::TryInto;

use super::{
  pitch_type::{pitch_from_class_num, UNKNOWN_CLASS},
  FeatureVector, PitchClassifier, INPUT_DIMENSION,
};
use crate::error::{Error, Result};

/// Index of the first strictly greatest probability above zero.
/// If nothing is above zero the result is [`UNKNOWN_CLASS`].
pub fn pick_pitch_class(probabilities: &[f32]) -> usize {
  let mut max_value = 0.0;
  let mut predicted = UNKNOWN_CLASS;
  for (class, &p) in probabilities.iter().enumerate() {
    if p > max_value {
      predicted = class;
      max_value = p;
    }
  }
  predicted
}

/// Label of the most likely pitch type for one already-normalized sample.
pub fn predict_sample(classifier: &PitchClassifier, sample: &[f32]) -> Result<&'static str> {
  let features: FeatureVector = sample.try_into().map_err(|_| Error::Shape {
    expected: INPUT_DIMENSION,
    actual: sample.len(),
  })?;
  let probabilities = classifier.predict(&[features]);
  Ok(pitch_from_class_num(pick_pitch_class(&probabilities) as i64))
}
