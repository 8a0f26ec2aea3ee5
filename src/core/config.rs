//! Optimizer configuration with documented constants
//!
//! Every hyperparameter of the genetic search lives here, together with the
//! safety caps that keep a match or an optimize() call from running forever.

use serde::Deserialize;

/// How `Strategy::mutate` derives a child from its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationMode {
    /// Discard the parent's nodes and draw a fresh random strategy.
    ///
    /// The mutate pool then behaves like a second novel pool.
    #[default]
    Reseed,
    /// Keep the parent's nodes and nudge their weights by -1, 0 or +1.
    Perturb,
}

/// Configuration for the strategy optimizer and the matches it runs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    // === MATCH ===
    /// Turn limit for every simulated match
    ///
    /// A match stops once the initiative cursor has wrapped more often than
    /// this. At 0, the first wrap already ends it and nobody acts.
    pub maximum_turns: u32,

    /// Actions a character may take before its turn is ended for it
    ///
    /// Skills that never apply `end-turn` would otherwise let one character
    /// act forever inside a single turn.
    pub max_actions_per_turn: usize,

    // === GENERATIONS ===
    /// Independent matches averaged into one candidate's fitness
    pub simulations_per_generation: usize,

    /// Freshly randomised strategies added to every generation
    pub novel_strategy_count: usize,

    /// Top strategies carried unchanged into the next generation
    pub cloned_strategy_count: usize,

    /// Top strategies that each produce one mutated child
    pub mutated_strategy_count: usize,

    /// Top strategies shuffled and paired off into merged children
    pub merged_strategy_count: usize,

    /// Node limit for a merged strategy (lowest-fitness nodes are dropped)
    pub max_strategy_complexity: usize,

    /// Per-node mutation probability when `mutation_mode` is `perturb`
    ///
    /// At 1.0 every node is nudged; at 0.0 the child is an exact copy.
    pub mutation_coefficient: f64,

    /// Which mutation behaviour to use
    pub mutation_mode: MutationMode,

    /// Relative improvement a generation must beat to keep optimizing
    ///
    /// The search stops once `best <= last * (1 + threshold)`.
    pub fitness_improvement_threshold: f64,

    /// Hard cap on generations per optimize() call
    pub max_generations: usize,

    // === GROUPING ===
    /// Expression evaluated against each character to pick its strategy group
    pub strategy_grouping: serde_json::Value,

    /// Seed for the optimizer RNG. Absent means seeded from entropy.
    pub seed: Option<u64>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            maximum_turns: 10,
            max_actions_per_turn: 16,
            simulations_per_generation: 10,
            novel_strategy_count: 10,
            cloned_strategy_count: 3,
            mutated_strategy_count: 3,
            merged_strategy_count: 4,
            max_strategy_complexity: 8,
            mutation_coefficient: 1.0,
            mutation_mode: MutationMode::Reseed,
            fitness_improvement_threshold: 0.05,
            max_generations: 50,
            strategy_grouping: serde_json::json!({ "context": "alignment" }),
            seed: None,
        }
    }
}

impl StrategyConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.simulations_per_generation == 0 {
            return Err("simulations_per_generation must be at least 1".into());
        }

        if self.novel_strategy_count == 0 {
            return Err("novel_strategy_count must be at least 1".into());
        }

        if self.max_strategy_complexity == 0 {
            return Err("max_strategy_complexity must be at least 1".into());
        }

        if self.max_actions_per_turn == 0 {
            return Err("max_actions_per_turn must be at least 1".into());
        }

        if !(0.0..=1.0).contains(&self.mutation_coefficient) {
            return Err(format!(
                "mutation_coefficient ({}) must be within [0, 1]",
                self.mutation_coefficient
            ));
        }

        if self.fitness_improvement_threshold.is_nan() || self.fitness_improvement_threshold < 0.0
        {
            return Err(format!(
                "fitness_improvement_threshold ({}) must be non-negative",
                self.fitness_improvement_threshold
            ));
        }

        if self.max_generations == 0 {
            return Err("max_generations must be at least 1".into());
        }

        Ok(())
    }
}
