use std::fmt;

use rand::Rng;

use super::meta::{CharacterTemplate, MatchView};
use super::node::Node;
use crate::core::config::MutationMode;
use crate::core::types::StrategyId;
use crate::encounter::MatchAction;

/// A group's decision policy: weighted rules scored against candidate actions
#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub id: StrategyId,
    /// Group this strategy plays for
    pub name: String,
    pub fitness: f64,
    pub nodes: Vec<Node>,
}

impl Strategy {
    pub fn new(name: impl Into<String>, nodes: Vec<Node>) -> Self {
        Self {
            id: StrategyId::new(),
            name: name.into(),
            fitness: 0.0,
            nodes,
        }
    }

    /// A single random rule with weight in 0..=10
    pub fn random<R: Rng + ?Sized>(rng: &mut R, templates: &[CharacterTemplate], name: &str) -> Self {
        let weight = rng.gen_range(0..=10);
        Self::new(name, vec![Node::random(rng, templates, name, weight)])
    }

    /// Union of both rule sets, keeping the `max_complexity` fittest nodes
    pub fn merge(&self, other: &Strategy, max_complexity: usize) -> Self {
        let mut nodes: Vec<Node> = self.nodes.iter().chain(&other.nodes).cloned().collect();
        nodes.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
        nodes.truncate(max_complexity);
        Self::new(self.name.clone(), nodes)
    }

    /// Derive a child strategy.
    ///
    /// `Reseed` ignores the parent and draws a fresh random strategy.
    /// `Perturb` keeps the parent's rules and nudges each one's weight with
    /// probability `coefficient`.
    pub fn mutate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        templates: &[CharacterTemplate],
        mode: MutationMode,
        coefficient: f64,
    ) -> Self {
        match mode {
            MutationMode::Reseed => Self::random(rng, templates, &self.name),
            MutationMode::Perturb => {
                let nodes = self
                    .nodes
                    .iter()
                    .map(|node| {
                        if rng.gen_bool(coefficient.clamp(0.0, 1.0)) {
                            node.mutate(rng)
                        } else {
                            Node {
                                fitness: 0.0,
                                ..node.clone()
                            }
                        }
                    })
                    .collect();
                Self::new(self.name.clone(), nodes)
            }
        }
    }

    /// Index of the action with the strictly highest summed weight; the
    /// first one wins ties. `None` only for an empty list.
    pub fn choose_action(&self, view: &dyn MatchView, actions: &[MatchAction]) -> Option<usize> {
        let mut best: Option<(usize, i32)> = None;

        for (index, action) in actions.iter().enumerate() {
            let weight: i32 = self.nodes.iter().map(|node| node.weigh(view, action)).sum();
            if best.map_or(true, |(_, largest)| weight > largest) {
                best = Some((index, weight));
            }
        }

        best.map(|(index, _)| index)
    }

    /// Record fitness on the strategy and every node
    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
        for node in &mut self.nodes {
            node.fitness = fitness;
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Strategy: {} (Fitness: {})", self.name, self.fitness)?;
        for node in &self.nodes {
            write!(f, "\n==========\n{}", node)?;
        }
        Ok(())
    }
}
