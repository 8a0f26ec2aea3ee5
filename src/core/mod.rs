pub mod config;
pub mod error;
pub mod types;

pub use config::{MutationMode, StrategyConfig};
pub use error::{Result, SimError};
pub use types::{Board, Position, StrategyId, Turn};
