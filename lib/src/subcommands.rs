pub use events::*;
pub use server::*;
pub use train::*;

pub mod events;
pub mod server;
pub mod train;
