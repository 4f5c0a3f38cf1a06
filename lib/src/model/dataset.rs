use std::{convert::TryFrom, io::Read, path::Path};

use csv::{ReaderBuilder, Trim};
use itertools::Itertools;
use rand::{seq::SliceRandom, Rng};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{
  normalize_features, pitch_type::PitchType, Batch, FeatureVector, Label, NUM_PITCH_CLASSES,
};
use crate::error::{Error, Result};

pub const TRAINING_BATCH_SIZE: usize = 100;
/// Row counts of the bundled data files. Each is a whole number of class blocks.
pub const TRAINING_DATA_LENGTH: usize = 7000;
pub const TEST_DATA_LENGTH: usize = 700;

/// Header columns a data file must carry. `pitch_code` is the label.
pub const COLUMNS: [&str; 9] = [
  "vx0",
  "vy0",
  "vz0",
  "ax",
  "ay",
  "az",
  "start_speed",
  "left_handed_pitcher",
  "pitch_code",
];

#[derive(Debug, Deserialize)]
struct PitchRecord {
  vx0: f32,
  vy0: f32,
  vz0: f32,
  ax: f32,
  ay: f32,
  az: f32,
  start_speed: f32,
  left_handed_pitcher: f32,
  pitch_code: i64,
}

impl PitchRecord {
  fn raw_features(&self) -> FeatureVector {
    [
      self.vx0,
      self.vy0,
      self.vz0,
      self.ax,
      self.ay,
      self.az,
      self.start_speed,
      self.left_handed_pitcher,
    ]
  }
}

/// Normalized rows of one data file, in file order.
///
/// Loading is eager so that a missing file or a malformed row fails at construction.
/// Batching is lazy and can be restarted any number of times.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
  features: Vec<FeatureVector>,
  labels: Vec<Label>,
}

impl Dataset {
  pub fn open(path: &Path) -> Result<Self> {
    let reader = ReaderBuilder::new()
      .has_headers(true)
      .trim(Trim::All)
      .from_path(path)
      .map_err(|source| Error::Dataset {
        path: path.to_path_buf(),
        source,
      })?;
    let dataset = Self::from_csv(reader).map_err(|err| match err {
      Error::Csv(source) => Error::Dataset {
        path: path.to_path_buf(),
        source,
      },
      other => other,
    })?;
    info!("Loaded {} rows from {}", dataset.len(), path.display());
    Ok(dataset)
  }

  pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
    Self::from_csv(ReaderBuilder::new().has_headers(true).trim(Trim::All).from_reader(reader))
  }

  fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
    let headers = reader.headers()?.clone();
    if let Some(missing) = COLUMNS.iter().copied().find(|column| !headers.iter().any(|h| h == *column)) {
      return Err(Error::MissingColumn(missing));
    }

    let mut dataset = Dataset::default();
    for (row, record) in reader.deserialize::<PitchRecord>().enumerate() {
      let record = record?;
      let pitch = usize::try_from(record.pitch_code)
        .ok()
        .and_then(PitchType::from_class_num)
        .ok_or(Error::InvalidLabel {
          row: row + 1,
          code: record.pitch_code,
        })?;
      dataset.features.push(normalize_features(&record.raw_features()));
      dataset.labels.push(pitch.class_num());
    }
    Ok(dataset)
  }

  pub fn len(&self) -> usize {
    self.features.len()
  }

  pub fn is_empty(&self) -> bool {
    self.features.is_empty()
  }

  pub fn labels(&self) -> &[Label] {
    &self.labels
  }

  /// Rows per class block, assuming every class has the same number of rows.
  pub fn class_size(&self) -> usize {
    self.len() / NUM_PITCH_CLASSES
  }

  /// True when the labels form `NUM_PITCH_CLASSES` contiguous, equally sized blocks in class order.
  pub fn has_class_blocks(&self) -> bool {
    let class_size = self.class_size();
    self.len() % NUM_PITCH_CLASSES == 0
      && self
        .labels
        .iter()
        .enumerate()
        .all(|(row, &label)| label == row / class_size)
  }

  /// One pass over the data in shuffled order, `batch_size` rows at a time.
  /// The shuffle covers the whole dataset. The last batch may be short.
  pub fn shuffled_batches<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Batches<'_> {
    let mut order = (0..self.len()).collect_vec();
    order.shuffle(rng);
    let chunks = order.chunks(batch_size.max(1)).map(<[usize]>::to_vec).collect_vec();
    debug!("Shuffled {} rows into {} batches", self.len(), chunks.len());
    Batches {
      dataset: self,
      chunks: chunks.into_iter(),
    }
  }

  /// The whole dataset as a single batch, in file order.
  pub fn validation_batch(&self) -> Batch {
    Batch {
      features: self.features.clone(),
      labels: self.labels.clone(),
    }
  }

  fn gather(&self, rows: &[usize]) -> Batch {
    Batch {
      features: rows.iter().map(|&row| self.features[row]).collect(),
      labels: rows.iter().map(|&row| self.labels[row]).collect(),
    }
  }
}

/// Lazily gathered batches of one pass over a [`Dataset`].
#[derive(Debug)]
pub struct Batches<'a> {
  dataset: &'a Dataset,
  chunks: std::vec::IntoIter<Vec<usize>>,
}

impl Iterator for Batches<'_> {
  type Item = Batch;

  fn next(&mut self) -> Option<Batch> {
    self.chunks.next().map(|rows| self.dataset.gather(&rows))
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    self.chunks.size_hint()
  }
}

impl ExactSizeIterator for Batches<'_> {}

/// The training file and the held-out test file.
#[derive(Debug, Clone)]
pub struct PitchDatasets {
  pub training: Dataset,
  pub test: Dataset,
}

impl PitchDatasets {
  pub fn new(training: Dataset, test: Dataset) -> Self {
    for (name, dataset, expected) in [
      ("training", &training, TRAINING_DATA_LENGTH),
      ("test", &test, TEST_DATA_LENGTH),
    ] {
      if dataset.len() != expected {
        debug!("{} data has {} rows, bundled file has {}", name, dataset.len(), expected);
      }
      if !dataset.has_class_blocks() {
        warn!(
          "{} data is not laid out in {} equal class blocks; per-class accuracy will be off",
          name, NUM_PITCH_CLASSES
        );
      }
    }
    Self { training, test }
  }

  pub fn load(training_path: &Path, test_path: &Path) -> Result<Self> {
    Ok(Self::new(Dataset::open(training_path)?, Dataset::open(test_path)?))
  }
}

/// Class-ordered CSV text with `rows_per_class` rows per pitch type.
/// Start speed and vertical break separate the classes so a small network can learn them.
#[cfg(test)]
pub(crate) fn synthetic_csv(rows_per_class: usize) -> String {
  let mut csv = COLUMNS.join(",");
  csv.push('\n');
  for class in 0..NUM_PITCH_CLASSES {
    for row in 0..rows_per_class {
      let jitter = (row % 10) as f32 * 0.1;
      let speed = 65.0 + class as f32 * 5.0 + jitter;
      let az = -40.0 + class as f32 * 6.0 - jitter;
      csv.push_str(&format!(
        "{},{},{},{},{},{},{},{},{}\n",
        -2.0 + jitter,
        -130.0 + class as f32,
        -4.0,
        -5.0 + class as f32 * 3.0,
        25.0,
        az,
        speed,
        row % 2,
        class
      ));
    }
  }
  csv
}
