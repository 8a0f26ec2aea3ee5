//! Turn-based match simulation driven by interpreted rules

mod action;
mod character;
mod effects;
mod initiative;
mod match_context;
mod resources;
mod targeting;
mod trigger;

pub use action::{MatchAction, ABSTAIN};
pub use character::{Hook, MatchAbility, MatchCharacter, MatchSkill};
pub use effects::{Effect, ACTOR, ATTACK, DAMAGE};
pub use initiative::{InitiativeSet, Schedule, TurnTaker};
pub use match_context::{
    match_root, MatchContext, MatchObserver, MatchSummary, CURRENT_ROLL, MAX_HOOK_DEPTH, TURN,
};
pub use resources::{MatchResourceSet, ResourceRecord, HIT_POINTS};
pub use targeting::Targeting;
pub use trigger::Trigger;
