//! Pitch type classification: a fixed-schema dataset pipeline, a small dense network
//! trained for a fixed number of epochs, and a websocket server that answers
//! predictions while training runs.

pub mod error;
pub mod model;
pub mod subcommands;
pub mod training;
pub mod utils;

pub use error::{Error, Result};
pub use training::{SharedClassifier, Trainer, TrainingState};
