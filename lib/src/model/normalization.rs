//! Fixed min-max scaling of raw pitch measurements.
//!
//! The bounds below were measured once on the training distribution and are applied
//! unchanged to every dataset, training and test alike. They are never recomputed
//! from the data being transformed.

use super::{FeatureVector, INPUT_DIMENSION};

pub const VX0_MIN: f32 = -18.885;
pub const VX0_MAX: f32 = 18.065;
pub const VY0_MIN: f32 = -152.463;
pub const VY0_MAX: f32 = -86.374;
pub const VZ0_MIN: f32 = -15.514_608;
pub const VZ0_MAX: f32 = 9.974;
pub const AX_MIN: f32 = -48.028_763;
pub const AX_MAX: f32 = 30.592;
pub const AY_MIN: f32 = 9.397;
pub const AY_MAX: f32 = 49.18;
pub const AZ_MIN: f32 = -49.339;
pub const AZ_MAX: f32 = 2.955_228_5;
pub const START_SPEED_MIN: f32 = 59.0;
pub const START_SPEED_MAX: f32 = 104.4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureBounds {
  pub min: f32,
  pub max: f32,
}

impl FeatureBounds {
  pub const fn new(min: f32, max: f32) -> Self {
    Self { min, max }
  }
}

/// Per-column bounds in feature order. Handedness is already 0/1 and has none.
pub const FEATURE_BOUNDS: [Option<FeatureBounds>; INPUT_DIMENSION] = [
  Some(FeatureBounds::new(VX0_MIN, VX0_MAX)),
  Some(FeatureBounds::new(VY0_MIN, VY0_MAX)),
  Some(FeatureBounds::new(VZ0_MIN, VZ0_MAX)),
  Some(FeatureBounds::new(AX_MIN, AX_MAX)),
  Some(FeatureBounds::new(AY_MIN, AY_MAX)),
  Some(FeatureBounds::new(AZ_MIN, AZ_MAX)),
  Some(FeatureBounds::new(START_SPEED_MIN, START_SPEED_MAX)),
  None,
];

/// `(value - min) / (max - min)`, without clamping. Missing bounds leave the value as is.
pub fn normalize(value: f32, min: Option<f32>, max: Option<f32>) -> f32 {
  match (min, max) {
    (Some(min), Some(max)) => (value - min) / (max - min),
    _ => value,
  }
}

/// Scales a raw measurement row column by column.
pub fn normalize_features(raw: &FeatureVector) -> FeatureVector {
  let mut scaled = *raw;
  for (value, bounds) in scaled.iter_mut().zip(FEATURE_BOUNDS.iter()) {
    *value = normalize(*value, bounds.map(|b| b.min), bounds.map(|b| b.max));
  }
  scaled
}
