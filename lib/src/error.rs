use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while loading data, training or serving.
///
/// Degenerate numeric situations (uneven class blocks, an all-zero prediction)
/// are deliberately absent: those produce sentinel output instead of errors.
#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to load dataset from {}: {source}", path.display())]
  Dataset {
    path: PathBuf,
    #[source]
    source: csv::Error,
  },
  #[error("malformed dataset: {0}")]
  Csv(#[from] csv::Error),
  #[error("dataset header is missing column `{0}`")]
  MissingColumn(&'static str),
  #[error("row {row}: pitch_code {code} is not a known pitch class")]
  InvalidLabel { row: usize, code: i64 },
  #[error("expected a feature vector of length {expected}, got {actual}")]
  Shape { expected: usize, actual: usize },
  #[error("optimizer step failed: {0}")]
  Optimizer(String),
  #[error("model worker has stopped")]
  ModelStopped,
  #[error("background task failed: {0}")]
  Task(#[from] tokio::task::JoinError),
  #[error(transparent)]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
