//! Scenario definitions loaded from JSON

pub mod environment;
mod loader;

pub use environment::{Definition, Environment};
pub use loader::{load_scenario, parse_scenario, MatchSetup, Scenario};
