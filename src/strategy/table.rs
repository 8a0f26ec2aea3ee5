use std::collections::BTreeMap;

use super::policy::Strategy;
use crate::context::{ContextRef, Host, Value};
use crate::core::error::{Result, SimError};

/// Live strategies keyed by group, plus the expression that assigns
/// characters to groups
#[derive(Debug, Clone)]
pub struct StrategyTable {
    grouping: serde_json::Value,
    strategies: BTreeMap<String, Strategy>,
}

impl StrategyTable {
    pub fn new(grouping: serde_json::Value) -> Self {
        Self {
            grouping,
            strategies: BTreeMap::new(),
        }
    }

    /// Evaluate the grouping expression against a character context
    pub fn group_of(&self, character: &ContextRef, host: &mut dyn Host) -> Result<String> {
        let group = character.eval(&Value::from(&self.grouping), host)?;
        group.as_key().ok_or_else(|| {
            SimError::invalid_definition(
                character.name(),
                format!("strategy grouping gave a {}", group.type_name()),
            )
        })
    }

    pub fn get(&self, group: &str) -> Result<&Strategy> {
        self.strategies
            .get(group)
            .ok_or_else(|| SimError::UnknownStrategy(group.to_string()))
    }

    /// Install a strategy for its group, returning the one it replaced
    pub fn insert(&mut self, strategy: Strategy) -> Option<Strategy> {
        self.strategies.insert(strategy.name.clone(), strategy)
    }

    pub fn contains(&self, group: &str) -> bool {
        self.strategies.contains_key(group)
    }

    pub fn names(&self) -> Vec<String> {
        self.strategies.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Strategy> {
        self.strategies.values()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Copy of the table with `candidate` standing in for its group
    pub fn with_candidate(&self, candidate: &Strategy) -> Self {
        let mut table = self.clone();
        table.insert(candidate.clone());
        table
    }
}
