//! One encounter from setup to finish
//!
//! The loop alternates between two states. With an empty action stack it asks
//! the initiative set whose turn it is and pushes that character's candidate
//! actions. With a pending list it pops it, lets the owning group's strategy
//! pick one, applies it, then ticks every character still in play.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::action::MatchAction;
use super::character::{Hook, MatchAbility, MatchCharacter};
use super::effects::ACTOR;
use super::initiative::{InitiativeSet, Schedule, TurnTaker};
use super::trigger::Trigger;
use crate::context::{roll_dice, Context, ContextRef, EvalError, Host, Value, ValueMap};
use crate::core::config::StrategyConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{Board, Turn};
use crate::rules::{Environment, MatchSetup};
use crate::strategy::meta::MatchView;
use crate::strategy::{Strategy, StrategyTable};

/// Nested hook firings allowed before the match is aborted
pub const MAX_HOOK_DEPTH: usize = 64;
/// Temp key holding the die total while a `roll` hook runs
pub const CURRENT_ROLL: &str = "current_roll";
/// Root property holding the turn being played
pub const TURN: &str = "turn";

/// Callbacks for watching a match play out. Every method defaults to nothing.
pub trait MatchObserver {
    fn on_character(&mut self, _character: &MatchCharacter, _turn: Turn) {}

    fn on_action(
        &mut self,
        _actor: &MatchCharacter,
        _strategy: &Strategy,
        _candidates: &[MatchAction],
        _chosen: &MatchAction,
    ) {
    }

    fn on_finish(&mut self, _summary: &MatchSummary) {}
}

impl MatchObserver for () {}

/// Outcome of one finished match
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSummary {
    pub turn: Turn,
    pub actions_taken: usize,
    /// Characters still in play, in setup order
    pub in_play: Vec<String>,
    /// Fitness of every strategy group present
    pub fitness: BTreeMap<String, f64>,
}

/// Root context of a match: setup properties plus the board size
pub fn match_root(game: &str, setup: &MatchSetup) -> ContextRef {
    Context::new(game)
        .with_properties(Value::map_from_json(&setup.properties))
        .with_property("board_width", i64::from(setup.board_width))
        .with_property("board_height", i64::from(setup.board_height))
        .with_property(TURN, 0i64)
        .into_ref()
}

pub struct MatchContext<'a> {
    pub(super) name: String,
    pub(super) strategies: &'a StrategyTable,
    pub(super) context: ContextRef,
    pub(super) board: Board,
    pub(super) characters: Vec<MatchCharacter>,
    pub(super) initiative: InitiativeSet,
    /// Candidate lists waiting for a strategy to choose from
    pub(super) action_set_stack: Vec<Vec<MatchAction>>,
    pub(super) maximum_turns: Turn,
    pub(super) max_actions_per_turn: usize,
    pub(super) actions_this_turn: usize,
    pub(super) actions_taken: usize,
    pub(super) rng: ChaCha8Rng,
    pub(super) hook_depth: usize,
    pub(super) in_roll_hook: bool,
}

impl<'a> MatchContext<'a> {
    /// Build every participant of `setup` and fire their `initialize` hooks
    pub fn new(
        environment: &Environment,
        game: &str,
        setup: &MatchSetup,
        strategies: &'a StrategyTable,
        config: &StrategyConfig,
        seed: u64,
    ) -> Result<Self> {
        let context = match_root(game, setup);
        let mut match_context = Self {
            name: game.to_string(),
            strategies,
            context: context.clone(),
            board: setup.board(),
            characters: Vec::with_capacity(setup.characters.len()),
            initiative: InitiativeSet::new(),
            action_set_stack: Vec::new(),
            maximum_turns: config.maximum_turns,
            max_actions_per_turn: config.max_actions_per_turn,
            actions_this_turn: 0,
            actions_taken: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            hook_depth: 0,
            in_roll_hook: false,
        };

        for (definition, instance) in setup.instances() {
            let mut character =
                MatchCharacter::build(environment, &definition, &instance, &context, &mut match_context)?;
            character.group = strategies.group_of(&character.context, &mut match_context)?;

            let index = match_context.characters.len();
            match_context.initiative.add_character(index, character.initiative);
            match_context.characters.push(character);
        }

        // a compulsory pool that starts empty means the character never plays
        for character in &mut match_context.characters {
            if character.resources.lost_compulsory() {
                character.set_in_play(false);
            }
        }

        for index in 0..match_context.characters.len() {
            match_context.trigger_hook(index, Hook::Initialize)?;
        }

        Ok(match_context)
    }

    /// Play until one alignment is left standing or the turn limit passes
    pub fn simulate(&mut self, observer: &mut dyn MatchObserver) -> Result<MatchSummary> {
        while self.is_ongoing() {
            if let Some(actions) = self.action_set_stack.pop() {
                self.take_action(actions, observer)?;
            } else {
                if let Some(index) = self.get_next_character()? {
                    observer.on_character(&self.characters[index], self.turn());
                    let actions = self.actions_for(index)?;
                    self.action_set_stack.push(actions);
                }
            }
        }

        let summary = self.summary();
        tracing::debug!(
            "{} finished on turn {} after {} actions, in play: {:?}",
            self.name,
            summary.turn,
            summary.actions_taken,
            summary.in_play
        );
        observer.on_finish(&summary);
        Ok(summary)
    }

    fn take_action(&mut self, actions: Vec<MatchAction>, observer: &mut dyn MatchObserver) -> Result<()> {
        let Some(actor) = actions.first().map(|action| action.actor) else {
            return Ok(());
        };
        let strategies = self.strategies;
        let strategy = strategies.get(&self.characters[actor].group)?;

        let chosen = strategy.choose_action(&*self, &actions).unwrap_or(0);
        let action = &actions[chosen];
        observer.on_action(&self.characters[actor], strategy, &actions, action);
        tracing::trace!("{}", action);

        self.act(action)?;
        self.actions_taken += 1;
        self.actions_this_turn += 1;

        if self.characters[actor].is_turn() && self.actions_this_turn >= self.max_actions_per_turn {
            tracing::warn!(
                "{} took {} actions without ending its turn, ending it",
                self.characters[actor].name,
                self.actions_this_turn
            );
            self.end_turn(actor)?;
        }

        for index in 0..self.characters.len() {
            if self.characters[index].in_play() {
                self.trigger_hook(index, Hook::Ticker)?;
            }
        }
        Ok(())
    }

    /// The character whose turn it is, starting turns as the initiative set
    /// hands them out. `None` when a new initiative bucket was entered.
    pub fn get_next_character(&mut self) -> Result<Option<usize>> {
        loop {
            match self.initiative.advance(&self.characters) {
                Schedule::Acting(index) => return Ok(Some(index)),
                Schedule::Start(index) => self.start_turn(index)?,
                Schedule::Loaded(head) => {
                    self.context.set(TURN, i64::from(self.turn()));
                    if let Some(index) = head {
                        self.start_turn(index)?;
                    }
                    return Ok(None);
                }
            }
        }
    }

    fn start_turn(&mut self, index: usize) -> Result<()> {
        self.characters[index].set_turn(true);
        self.actions_this_turn = 0;
        self.trigger_hook(index, Hook::StartOfTurn)
    }

    /// Every (skill, target) pair whose skill conditions hold, or abstain
    pub fn actions_for(&mut self, index: usize) -> Result<Vec<MatchAction>> {
        let skills = self.characters[index].skills.clone();
        let mut actions = Vec::new();

        for skill in &skills {
            if !skill.context.check_conditions(&skill.conditions, self)? {
                continue;
            }
            for target in skill.targeting.targets(index, &self.characters) {
                actions.push(MatchAction::new(
                    (index, &self.characters[index]),
                    (target, &self.characters[target]),
                    skill,
                ));
            }
        }

        if actions.is_empty() {
            actions.push(MatchAction::abstain(index, &self.characters[index]));
        }
        Ok(actions)
    }

    pub fn act(&mut self, action: &MatchAction) -> Result<()> {
        self.fire(action.actor, action.target, &action.source, &action.trigger)
    }

    /// Apply a trigger from `actor` to `target`, with `actor` visible to the
    /// trigger's expressions for the duration
    fn fire(&mut self, actor: usize, target: usize, source: &ContextRef, trigger: &Rc<Trigger>) -> Result<()> {
        let actor_context = self.characters[actor].context.clone();
        let target_context = self.characters[target].context.clone();

        let previous = target_context.set_temp(ACTOR, Value::Context(actor_context));
        let result = self.resolve(actor, target, source, trigger);
        target_context.restore_temp(ACTOR, previous);
        result
    }

    fn resolve(&mut self, actor: usize, target: usize, source: &ContextRef, trigger: &Trigger) -> Result<()> {
        let target_context = self.characters[target].context.clone();
        let scope = target_context.re_context(&source.child("trigger", ValueMap::new()));

        let branch = if scope.check_conditions(&trigger.conditions, self)? {
            &trigger.success_effects
        } else {
            &trigger.failure_effects
        };

        for effect in branch.iter().chain(&trigger.effects) {
            self.apply_effect(actor, target, &scope, effect)?;
        }
        Ok(())
    }

    /// Fire the abilities a character has on `hook`.
    ///
    /// Characters out of play only react to their own removal.
    pub(super) fn trigger_hook(&mut self, index: usize, hook: Hook) -> Result<()> {
        let character = &self.characters[index];
        if !character.in_play() && hook != Hook::RemoveFromPlay {
            return Ok(());
        }
        let Some(abilities) = character.hooks.get(&hook).filter(|a| !a.is_empty()).cloned() else {
            return Ok(());
        };

        if self.hook_depth >= MAX_HOOK_DEPTH {
            return Err(SimError::HookRecursion(MAX_HOOK_DEPTH));
        }
        self.hook_depth += 1;
        let result = self.run_abilities(index, &abilities);
        self.hook_depth -= 1;
        result
    }

    fn run_abilities(&mut self, index: usize, abilities: &[MatchAbility]) -> Result<()> {
        for ability in abilities {
            if !ability.context.check_conditions(&ability.conditions, self)? {
                continue;
            }
            let target = ability
                .targeting
                .targets(index, &self.characters)
                .first()
                .copied()
                .unwrap_or(index);
            tracing::trace!(
                "{} uses {} on {}",
                self.characters[index].name,
                ability.name,
                self.characters[target].name
            );
            self.fire(index, target, &ability.context, &ability.trigger)?;
        }
        Ok(())
    }

    /// More than one alignment still has someone in play
    pub fn is_conflict(&self) -> bool {
        let mut alignments = self
            .characters
            .iter()
            .filter(|character| character.in_play())
            .map(|character| character.alignment.as_str());

        match alignments.next() {
            Some(first) => alignments.any(|alignment| alignment != first),
            None => false,
        }
    }

    pub fn is_ongoing(&self) -> bool {
        self.is_conflict() && self.turn() <= self.maximum_turns
    }

    pub fn turn(&self) -> Turn {
        self.initiative.turn()
    }

    /// Sum of resource value over the characters playing for `group`
    pub fn fitness(&self, group: &str) -> f64 {
        self.characters
            .iter()
            .filter(|character| character.group == group)
            .map(|character| character.resources.total_value())
            .sum()
    }

    pub fn summary(&self) -> MatchSummary {
        let mut fitness = BTreeMap::new();
        for character in &self.characters {
            fitness
                .entry(character.group.clone())
                .or_insert_with(|| self.fitness(&character.group));
        }

        MatchSummary {
            turn: self.turn(),
            actions_taken: self.actions_taken,
            in_play: self
                .characters
                .iter()
                .filter(|character| character.in_play())
                .map(|character| character.name.clone())
                .collect(),
            fitness,
        }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.characters.iter().position(|character| character.name == name)
    }

    pub fn character(&self, name: &str) -> Result<&MatchCharacter> {
        self.index_of(name)
            .map(|index| &self.characters[index])
            .ok_or_else(|| SimError::UnknownCharacter(name.to_string()))
    }

    pub fn characters(&self) -> &[MatchCharacter] {
        &self.characters
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &ContextRef {
        &self.context
    }

    pub fn board(&self) -> Board {
        self.board
    }

    pub fn actions_taken(&self) -> usize {
        self.actions_taken
    }

    pub fn initiative(&self) -> &InitiativeSet {
        &self.initiative
    }
}

impl Host for MatchContext<'_> {
    /// Roll dice, then let the owning character's `roll` hook see the total
    fn roll(&mut self, scope: &ContextRef, count: u32, sides: u32) -> std::result::Result<i64, EvalError> {
        let total = roll_dice(&mut self.rng, count, sides);
        tracing::trace!("Rolled {}d{} = {}", count, sides, total);

        if self.in_roll_hook {
            return Ok(total);
        }
        let Some(index) = scope.owner().and_then(|owner| self.index_of(&owner)) else {
            return Ok(total);
        };
        if !self.characters[index].has_hook(Hook::Roll) {
            return Ok(total);
        }

        let context = self.characters[index].context.clone();
        let previous = context.set_temp(CURRENT_ROLL, total as f64);
        self.in_roll_hook = true;
        let result = self.trigger_hook(index, Hook::Roll);
        self.in_roll_hook = false;

        let rolled = context
            .get_temp(CURRENT_ROLL)
            .and_then(|value| value.as_number())
            .map_or(total, |value| value as i64);
        context.restore_temp(CURRENT_ROLL, previous);

        result.map_err(|e| EvalError::Host(e.to_string()))?;
        Ok(rolled)
    }

    fn quantity(&self, character: &str, resource: &str) -> Option<f64> {
        let index = self.index_of(character)?;
        self.characters[index].resources.quantity(resource).ok()
    }

    fn initiative(&self, character: &str) -> Option<f64> {
        self.index_of(character).map(|index| self.characters[index].initiative)
    }

    fn in_play(&self, character: &str) -> Option<bool> {
        self.index_of(character).map(|index| self.characters[index].in_play())
    }
}

impl TurnTaker for Vec<MatchCharacter> {
    fn is_turn(&self, index: usize) -> bool {
        self[index].is_turn()
    }

    fn can_act(&self, index: usize) -> bool {
        self[index].in_play()
    }
}

impl MatchView for MatchContext<'_> {
    fn quantity_of(&self, character: &str, resource: &str) -> Option<f64> {
        Host::quantity(self, character, resource)
    }

    fn damage_of(&self, character: &str, resource: &str) -> Option<f64> {
        let index = self.index_of(character)?;
        self.characters[index].resources.damage(resource).ok()
    }
}

impl fmt::Display for MatchContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Game: {} (turn {})", self.name, self.turn())?;
        for character in &self.characters {
            write!(f, "\n{}", character)?;
        }
        Ok(())
    }
}
