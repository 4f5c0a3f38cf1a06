use std::{error::Error, fs, path::{Path, PathBuf}};

use serde::Deserialize;

pub const DEFAULT_TRAINING_DATA: &str = "data/pitch_type_training_data.csv";
pub const DEFAULT_TEST_DATA: &str = "data/pitch_type_test_data.csv";

/// Settings shared by all subcommands.
/// Also defines the config file format (every field can be omitted).
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
  /// Port of the prediction socket
  pub port: Option<u16>,
  /// Labeled training rows
  pub training_data: Option<PathBuf>,
  /// Held-out rows, class ordered
  pub test_data: Option<PathBuf>,
  /// Evaluate the test data after every epoch as well
  pub report_validation: Option<bool>,
  /// Seed for weight initialization and shuffling
  pub seed: Option<u64>,
}

impl AppConfig {
  pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
  }

  // merge configs where the second overwrites the first
  pub fn merge(self, other: Self) -> Self {
    Self {
      port: other.port.or(self.port),
      training_data: other.training_data.or(self.training_data),
      test_data: other.test_data.or(self.test_data),
      report_validation: other.report_validation.or(self.report_validation),
      seed: other.seed.or(self.seed),
    }
  }

  pub fn training_data(&self) -> PathBuf {
    self.training_data.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_TRAINING_DATA))
  }

  pub fn test_data(&self) -> PathBuf {
    self.test_data.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_TEST_DATA))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_later_config_wins() {
    let file: AppConfig = serde_yaml::from_str("port: 9000\nseed: 4\nreport_validation: true\n").unwrap();
    let cli = AppConfig {
      port: Some(9100),
      ..AppConfig::default()
    };
    let merged = file.merge(cli);
    assert_eq!(merged.port, Some(9100));
    assert_eq!(merged.seed, Some(4));
    assert_eq!(merged.report_validation, Some(true));
    assert_eq!(merged.training_data(), PathBuf::from(DEFAULT_TRAINING_DATA));
  }

  #[test]
  fn test_unknown_keys_are_rejected() {
    assert!(serde_yaml::from_str::<AppConfig>("epochs: 20\n").is_err());
  }
}
