use super::{
  pitch_type::PitchType, ClassAccuracy, Dataset, EvaluationResult, PitchClassifier,
  NUM_PITCH_CLASSES,
};

/// Mean probability given to class `pitch_index` over its block of validation rows.
///
/// `values` holds the output distributions concatenated row-major, and the rows are
/// expected to come in class order with exactly `class_size` rows per class. Anything
/// else gives a silently wrong number rather than an error.
pub fn calc_pitch_class_eval(pitch_index: usize, class_size: usize, values: &[f32]) -> f32 {
  let start = pitch_index * class_size * NUM_PITCH_CLASSES + pitch_index;
  let total: f32 = values
    .iter()
    .skip(start)
    .step_by(NUM_PITCH_CLASSES)
    .take(class_size)
    .sum();
  total / class_size as f32
}

fn per_class_eval(classifier: &PitchClassifier, dataset: &Dataset) -> [f32; NUM_PITCH_CLASSES] {
  let batch = dataset.validation_batch();
  let values = classifier.predict(&batch.features);
  let class_size = dataset.class_size();
  let mut evals = [0.0; NUM_PITCH_CLASSES];
  for (pitch_index, eval) in evals.iter_mut().enumerate() {
    *eval = calc_pitch_class_eval(pitch_index, class_size, &values);
  }
  evals
}

/// Per-class accuracy on the training data and, when given, the test data.
pub fn evaluate(
  classifier: &PitchClassifier,
  training: &Dataset,
  test: Option<&Dataset>,
) -> EvaluationResult {
  let training_evals = per_class_eval(classifier, training);
  let validation_evals = test.map(|test| per_class_eval(classifier, test));

  PitchType::ALL
    .iter()
    .map(|pitch| {
      let index = pitch.class_num();
      let accuracy = ClassAccuracy {
        training: training_evals[index],
        validation: validation_evals.map(|evals| evals[index]),
      };
      (pitch.label(), accuracy)
    })
    .collect()
}

/// The evaluation map as a JSON object, for logging.
pub fn accuracy_json(result: &EvaluationResult) -> String {
  serde_json::to_string(result).unwrap_or_else(|err| format!("<unencodable evaluation: {}>", err))
}
