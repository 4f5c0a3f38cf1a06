use std::convert::TryFrom;

use super::NUM_PITCH_CLASSES;

/// Label reported for any class code outside the known range.
pub const UNKNOWN_PITCH: &str = "Unknown";

/// Class code the predictor falls back to when no class scores above zero.
pub const UNKNOWN_CLASS: usize = NUM_PITCH_CLASSES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchType {
  TwoSeamFastball,
  FourSeamFastball,
  Sinker,
  Cutter,
  Slider,
  Changeup,
  Curveball,
}

impl PitchType {
  /// In class-code order.
  pub const ALL: [PitchType; NUM_PITCH_CLASSES] = [
    PitchType::TwoSeamFastball,
    PitchType::FourSeamFastball,
    PitchType::Sinker,
    PitchType::Cutter,
    PitchType::Slider,
    PitchType::Changeup,
    PitchType::Curveball,
  ];

  pub fn from_class_num(class_num: usize) -> Option<Self> {
    Self::ALL.get(class_num).copied()
  }

  pub fn class_num(self) -> usize {
    self as usize
  }

  pub fn label(self) -> &'static str {
    match self {
      PitchType::TwoSeamFastball => "Fastball (2-seam)",
      PitchType::FourSeamFastball => "Fastball (4-seam)",
      PitchType::Sinker => "Fastball (sinker)",
      PitchType::Cutter => "Fastball (cutter)",
      PitchType::Slider => "Slider",
      PitchType::Changeup => "Changeup",
      PitchType::Curveball => "Curveball",
    }
  }
}

/// Display name for a class code; anything outside `0..=6` is "Unknown".
pub fn pitch_from_class_num(class_num: i64) -> &'static str {
  usize::try_from(class_num)
    .ok()
    .and_then(PitchType::from_class_num)
    .map_or(UNKNOWN_PITCH, PitchType::label)
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use proptest::prelude::*;

  use super::*;

  #[test]
  fn test_known_labels() {
    assert_eq!(pitch_from_class_num(0), "Fastball (2-seam)");
    assert_eq!(pitch_from_class_num(3), "Fastball (cutter)");
    assert_eq!(pitch_from_class_num(4), "Slider");
    assert_eq!(pitch_from_class_num(6), "Curveball");
  }

  #[test]
  fn test_out_of_range_is_unknown() {
    assert_eq!(pitch_from_class_num(7), UNKNOWN_PITCH);
    assert_eq!(pitch_from_class_num(-1), UNKNOWN_PITCH);
    assert_eq!(pitch_from_class_num(UNKNOWN_CLASS as i64), UNKNOWN_PITCH);
  }

  #[test]
  fn test_labels_are_bijective() {
    let labels: HashSet<_> = (0..NUM_PITCH_CLASSES as i64).map(pitch_from_class_num).collect();
    assert_eq!(labels.len(), NUM_PITCH_CLASSES);
    assert!(!labels.contains(UNKNOWN_PITCH));
    for pitch in PitchType::ALL {
      assert_eq!(PitchType::from_class_num(pitch.class_num()), Some(pitch));
    }
  }

  proptest! {
    #[test]
    fn test_any_other_code_is_unknown(code in prop_oneof![i64::MIN..0i64, 7i64..i64::MAX]) {
      prop_assert_eq!(pitch_from_class_num(code), UNKNOWN_PITCH);
    }
  }
}
