//! Effects a trigger applies to characters
//!
//! Effect expressions are evaluated in the trigger's scope (the target's view
//! of the skill or ability). `target` names a scope key, normally `"actor"`,
//! whose character receives the effect instead of the trigger's target.

use serde::Deserialize;

use super::character::Hook;
use super::match_context::MatchContext;
use super::resources::HIT_POINTS;
use crate::context::{ContextRef, EvalError, Value, ValueMap};
use crate::core::error::{Result, SimError};

/// Temp key holding the acting character on the target
pub const ACTOR: &str = "actor";
/// Temp key holding `{type, hit_metric, save_metric}` during an attack
pub const ATTACK: &str = "attack";
/// Temp key holding `{amount, type}` while damage hooks run
pub const DAMAGE: &str = "damage";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "profile", rename_all = "kebab-case")]
pub enum Effect {
    /// Evaluate hit conditions and, on a hit, deal `damage`
    Attack {
        #[serde(rename = "type", default)]
        kind: Value,
        #[serde(default)]
        hit_metric: Value,
        #[serde(default)]
        save_metric: Value,
        #[serde(default)]
        hit_conditions: Vec<Value>,
        damage: Value,
        #[serde(default)]
        target: Option<String>,
    },
    /// Debit hit points
    Damage {
        value: Value,
        #[serde(rename = "type", default)]
        kind: Value,
        #[serde(default)]
        target: Option<String>,
    },
    Credit {
        #[serde(default)]
        target: Option<String>,
        arguments: (String, Value),
    },
    Debit {
        #[serde(default)]
        target: Option<String>,
        arguments: (String, Value),
    },
    Set {
        #[serde(default)]
        target: Option<String>,
        arguments: (String, Value),
    },
    EndTurn {
        #[serde(default)]
        target: Option<String>,
    },
    RemoveFromPlay {
        #[serde(default)]
        target: Option<String>,
    },
}

impl Effect {
    pub fn profile(&self) -> &'static str {
        match self {
            Effect::Attack { .. } => "attack",
            Effect::Damage { .. } => "damage",
            Effect::Credit { .. } => "credit",
            Effect::Debit { .. } => "debit",
            Effect::Set { .. } => "set",
            Effect::EndTurn { .. } => "end-turn",
            Effect::RemoveFromPlay { .. } => "remove-from-play",
        }
    }

    fn redirect(&self) -> Option<&str> {
        match self {
            Effect::Attack { target, .. }
            | Effect::Damage { target, .. }
            | Effect::Credit { target, .. }
            | Effect::Debit { target, .. }
            | Effect::Set { target, .. }
            | Effect::EndTurn { target }
            | Effect::RemoveFromPlay { target } => target.as_deref(),
        }
    }
}

impl MatchContext<'_> {
    /// Apply one effect of a trigger fired by `actor` at `target`
    pub(super) fn apply_effect(
        &mut self,
        actor: usize,
        target: usize,
        scope: &ContextRef,
        effect: &Effect,
    ) -> Result<()> {
        let recipient = self.recipient(target, scope, effect.redirect())?;

        match effect {
            Effect::Attack { .. } => self.attack(actor, recipient, scope, effect),
            Effect::Damage { value, kind, .. } => {
                let amount = self.number(scope, value, effect.profile())?;
                let kind = scope.eval(kind, self)?;
                self.damage(actor, recipient, amount, kind)
            }
            Effect::Credit {
                arguments: (resource, amount),
                ..
            } => {
                let amount = self.number(scope, amount, effect.profile())?;
                self.characters[recipient].resources.credit(resource, amount)?;
                self.check_compulsory(recipient)
            }
            Effect::Debit {
                arguments: (resource, amount),
                ..
            } => {
                let amount = self.number(scope, amount, effect.profile())?;
                self.characters[recipient].resources.debit(resource, amount)?;
                self.check_compulsory(recipient)
            }
            Effect::Set {
                arguments: (resource, amount),
                ..
            } => {
                let amount = self.number(scope, amount, effect.profile())?;
                self.characters[recipient].resources.set(resource, amount)?;
                self.check_compulsory(recipient)
            }
            Effect::EndTurn { .. } => self.end_turn(recipient),
            Effect::RemoveFromPlay { .. } => self.remove_from_play(recipient),
        }
    }

    /// Character receiving an effect: the target, or whoever `key` names
    fn recipient(&self, target: usize, scope: &ContextRef, key: Option<&str>) -> Result<usize> {
        let Some(key) = key else {
            return Ok(target);
        };

        let name = match scope.get(key) {
            Value::Context(ctx) => ctx.name(),
            Value::Text(name) => name,
            _ => return Err(SimError::UnknownCharacter(key.to_string())),
        };
        self.index_of(&name)
            .ok_or(SimError::UnknownCharacter(name))
    }

    fn number(&mut self, scope: &ContextRef, expression: &Value, what: &str) -> Result<f64> {
        match scope.eval(expression, self)? {
            Value::Number(n) => Ok(n),
            Value::Null => Err(EvalError::AbsentOperand(what.to_string()).into()),
            other => Err(EvalError::TypeMismatch {
                operator: what.to_string(),
                found: other.type_name(),
            }
            .into()),
        }
    }

    fn attack(&mut self, actor: usize, target: usize, scope: &ContextRef, effect: &Effect) -> Result<()> {
        let Effect::Attack { kind, .. } = effect else {
            return Ok(());
        };
        let actor_context = self.characters[actor].context.clone();
        let target_context = self.characters[target].context.clone();

        let kind = scope.eval(kind, self)?;
        let mut info = ValueMap::new();
        info.insert("type".into(), kind);

        let previous_actor = actor_context.set_temp(ATTACK, Value::Map(info.clone()));
        let previous_target = target_context.set_temp(ATTACK, Value::Map(info.clone()));

        let result = self.resolve_attack(actor, target, scope, effect, info);

        target_context.restore_temp(ATTACK, previous_target);
        actor_context.restore_temp(ATTACK, previous_actor);
        result
    }

    fn resolve_attack(
        &mut self,
        actor: usize,
        target: usize,
        scope: &ContextRef,
        effect: &Effect,
        mut info: ValueMap,
    ) -> Result<()> {
        let Effect::Attack {
            hit_metric,
            save_metric,
            hit_conditions,
            damage,
            ..
        } = effect
        else {
            return Ok(());
        };
        let contexts = [
            self.characters[actor].context.clone(),
            self.characters[target].context.clone(),
        ];

        for (key, expression) in [("hit_metric", hit_metric), ("save_metric", save_metric)] {
            let metric = scope.eval(expression, self)?;
            info.insert(key.into(), metric);
            for context in &contexts {
                context.set_temp(ATTACK, Value::Map(info.clone()));
            }
        }

        if scope.check_conditions(hit_conditions, self)? {
            let amount = self.number(scope, damage, effect.profile())?;
            let kind = info.get("type").cloned().unwrap_or_default();
            self.damage(actor, target, amount, kind)?;
        }
        Ok(())
    }

    /// Debit hit points and fire `damage_taken` / `damage_done`
    pub(super) fn damage(&mut self, actor: usize, target: usize, amount: f64, kind: Value) -> Result<()> {
        let actor_context = self.characters[actor].context.clone();
        let target_context = self.characters[target].context.clone();

        let mut info = ValueMap::new();
        info.insert("amount".into(), Value::Number(amount));
        info.insert("type".into(), kind);

        let previous_target = target_context.set_temp(DAMAGE, Value::Map(info.clone()));
        let previous_actor = actor_context.set_temp(DAMAGE, Value::Map(info));

        tracing::trace!(
            "{} takes {} damage from {}",
            self.characters[target].name,
            amount,
            self.characters[actor].name
        );
        let result = self.resolve_damage(actor, target, amount);

        actor_context.restore_temp(DAMAGE, previous_actor);
        target_context.restore_temp(DAMAGE, previous_target);
        result
    }

    fn resolve_damage(&mut self, actor: usize, target: usize, amount: f64) -> Result<()> {
        self.characters[target].resources.debit(HIT_POINTS, amount)?;
        self.check_compulsory(target)?;
        self.trigger_hook(target, Hook::DamageTaken)?;
        self.trigger_hook(actor, Hook::DamageDone)
    }

    /// Remove a character whose compulsory pool ran out
    pub(super) fn check_compulsory(&mut self, index: usize) -> Result<()> {
        let character = &self.characters[index];
        if character.in_play() && character.resources.lost_compulsory() {
            tracing::trace!("{} lost a compulsory resource", character.name);
            self.remove_from_play(index)?;
        }
        Ok(())
    }

    pub(super) fn end_turn(&mut self, index: usize) -> Result<()> {
        if !self.characters[index].is_turn() {
            return Ok(());
        }
        self.characters[index].set_turn(false);
        self.trigger_hook(index, Hook::EndOfTurn)
    }

    pub(super) fn remove_from_play(&mut self, index: usize) -> Result<()> {
        if !self.characters[index].in_play() {
            return Ok(());
        }
        tracing::debug!("{} is removed from play", self.characters[index].name);
        self.characters[index].set_in_play(false);
        self.characters[index].set_turn(false);
        self.trigger_hook(index, Hook::RemoveFromPlay)
    }
}
