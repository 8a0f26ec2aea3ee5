//! Strategies and the genetic search that evolves them

pub mod manager;
pub mod meta;
pub mod node;
pub mod policy;
pub mod table;

pub use manager::{OptimizationReport, StrategyManager};
pub use meta::{CharacterTemplate, MatchView, MetaAct, MetaAction, MetaCondition, MetaStatus};
pub use node::Node;
pub use policy::Strategy;
pub use table::StrategyTable;
