use std::fmt;
use std::rc::Rc;

use super::character::{MatchCharacter, MatchSkill};
use super::trigger::Trigger;
use crate::context::{Context, ContextRef};

/// Skill name of the synthetic action offered when nothing else qualifies
pub const ABSTAIN: &str = "abstain";

/// One candidate move: `actor` uses `skill_name` on `target`
#[derive(Debug, Clone)]
pub struct MatchAction {
    pub actor: usize,
    pub target: usize,
    pub actor_name: String,
    pub target_name: String,
    pub skill_name: String,
    /// Context of the skill, scoped under the actor
    pub source: ContextRef,
    pub trigger: Rc<Trigger>,
}

impl MatchAction {
    pub fn new(
        actor: (usize, &MatchCharacter),
        target: (usize, &MatchCharacter),
        skill: &MatchSkill,
    ) -> Self {
        Self {
            actor: actor.0,
            target: target.0,
            actor_name: actor.1.name.clone(),
            target_name: target.1.name.clone(),
            skill_name: skill.name.clone(),
            source: skill.context.clone(),
            trigger: Rc::clone(&skill.trigger),
        }
    }

    /// End the actor's turn without doing anything
    pub fn abstain(index: usize, actor: &MatchCharacter) -> Self {
        Self {
            actor: index,
            target: index,
            actor_name: actor.name.clone(),
            target_name: actor.name.clone(),
            skill_name: ABSTAIN.to_string(),
            source: Context::new(ABSTAIN).with_base(&actor.context).into_ref(),
            trigger: Rc::new(Trigger::abstain()),
        }
    }

    pub fn is_abstain(&self) -> bool {
        self.skill_name == ABSTAIN
    }
}

impl fmt::Display for MatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MatchAction: {} does {} at {}",
            self.actor_name, self.skill_name, self.target_name
        )
    }
}
