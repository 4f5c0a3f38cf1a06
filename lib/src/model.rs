pub mod dataset;
pub mod evaluation;
pub mod network;
pub mod normalization;
pub mod pitch_type;
pub mod prediction;
pub mod types;

pub use dataset::*;
pub use evaluation::*;
pub use network::*;
pub use normalization::*;
pub use pitch_type::*;
pub use prediction::*;
pub use types::*;
