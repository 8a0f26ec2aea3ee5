use std::fmt;

use rand::Rng;

use super::meta::{CharacterTemplate, MatchView, MetaAction, MetaCondition};
use crate::encounter::MatchAction;

/// One weighted rule: if `condition` holds and the action fits `action`,
/// add `weight` to that action's score
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub condition: MetaCondition,
    pub action: MetaAction,
    pub weight: i32,
    /// Fitness of the strategy this node last scored in
    pub fitness: f64,
}

impl Node {
    pub fn random<R: Rng + ?Sized>(
        rng: &mut R,
        templates: &[CharacterTemplate],
        group: &str,
        weight: i32,
    ) -> Self {
        Self {
            condition: MetaCondition::random(rng, templates),
            action: MetaAction::random(rng, templates, group),
            weight,
            fitness: 0.0,
        }
    }

    /// Same rule with the weight nudged by -1, 0 or +1
    pub fn mutate<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        Self {
            weight: self.weight + rng.gen_range(-1..=1),
            fitness: 0.0,
            ..self.clone()
        }
    }

    pub fn check_action(&self, view: &dyn MatchView, action: &MatchAction) -> bool {
        self.condition.check(view) && self.action.check(action)
    }

    pub fn weigh(&self, view: &dyn MatchView, action: &MatchAction) -> i32 {
        if self.check_action(view, action) {
            self.weight
        } else {
            0
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "If {}, then {}\n-------\nWeight: {}\nFitness: {}",
            self.condition, self.action, self.weight, self.fitness
        )
    }
}
