//! Random predicates that make up strategy nodes
//!
//! Every predicate names characters by their match instance name, drawn from
//! the manager's character templates.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::encounter::{MatchAction, HIT_POINTS};

/// Read-only view of a running match, as far as strategies need it
pub trait MatchView {
    /// Quantity of a character's pool; `None` when either is unknown
    fn quantity_of(&self, character: &str, resource: &str) -> Option<f64>;

    /// Missing quantity of a character's pool; `None` when either is unknown
    fn damage_of(&self, character: &str, resource: &str) -> Option<f64>;
}

/// What the optimizer knows about a participant before any match runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterTemplate {
    pub name: String,
    pub group: String,
    pub skills: Vec<String>,
}

/// Threshold test on a character's hit points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaStatus {
    /// Remaining hit points above the threshold
    Health(i32),
    /// Missing hit points above the threshold
    Damage(i32),
}

impl MetaStatus {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let threshold = rng.gen_range(0..=10);
        if rng.gen_bool(0.5) {
            MetaStatus::Health(threshold)
        } else {
            MetaStatus::Damage(threshold)
        }
    }

    pub fn check(&self, view: &dyn MatchView, character: &str) -> bool {
        match self {
            MetaStatus::Health(threshold) => view
                .quantity_of(character, HIT_POINTS)
                .is_some_and(|quantity| quantity > *threshold as f64),
            MetaStatus::Damage(threshold) => view
                .damage_of(character, HIT_POINTS)
                .is_some_and(|damage| damage > *threshold as f64),
        }
    }
}

impl fmt::Display for MetaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaStatus::Health(threshold) => write!(f, "[health] greater than [{}]", threshold),
            MetaStatus::Damage(threshold) => write!(f, "[damage] greater than [{}]", threshold),
        }
    }
}

/// "[target] has [status]"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaCondition {
    pub target: String,
    pub status: MetaStatus,
}

impl MetaCondition {
    pub fn random<R: Rng + ?Sized>(rng: &mut R, templates: &[CharacterTemplate]) -> Self {
        Self {
            target: templates
                .choose(rng)
                .map(|template| template.name.clone())
                .unwrap_or_default(),
            status: MetaStatus::random(rng),
        }
    }

    pub fn check(&self, view: &dyn MatchView) -> bool {
        self.status.check(view, &self.target)
    }
}

impl fmt::Display for MetaCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] has {}", self.target, self.status)
    }
}

/// Skill and target filters; `None` matches anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaAct {
    pub skill: Option<String>,
    pub target: Option<String>,
}

impl MetaAct {
    pub fn check(&self, action: &MatchAction) -> bool {
        self.skill.as_ref().map_or(true, |skill| *skill == action.skill_name)
            && self.target.as_ref().map_or(true, |target| *target == action.target_name)
    }
}

impl fmt::Display for MetaAct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "do [{}] at [{}]",
            self.skill.as_deref().unwrap_or("anything"),
            self.target.as_deref().unwrap_or("Anyone")
        )
    }
}

/// "[actor] do [skill] at [target]"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaAction {
    pub actor: Option<String>,
    pub act: MetaAct,
}

impl MetaAction {
    /// Draw an actor from the group's own characters, one of its skills, and
    /// a target from every character or nobody in particular
    pub fn random<R: Rng + ?Sized>(rng: &mut R, templates: &[CharacterTemplate], group: &str) -> Self {
        let actors: Vec<&CharacterTemplate> = templates
            .iter()
            .filter(|template| template.group == group)
            .collect();
        let actor = actors.choose(rng).copied();
        let skill = actor.and_then(|actor| actor.skills.choose(rng).cloned());

        let pick = rng.gen_range(0..=templates.len());
        let target = templates.get(pick).map(|template| template.name.clone());

        Self {
            actor: actor.map(|actor| actor.name.clone()),
            act: MetaAct { skill, target },
        }
    }

    pub fn check(&self, action: &MatchAction) -> bool {
        self.actor.as_ref().map_or(true, |actor| *actor == action.actor_name) && self.act.check(action)
    }
}

impl fmt::Display for MetaAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.actor.as_deref().unwrap_or("Anyone"), self.act)
    }
}
