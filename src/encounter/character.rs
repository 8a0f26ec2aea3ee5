//! Characters taking part in a match
//!
//! A `MatchCharacter` layers a per-match context over its definition:
//! `character -> definition template -> match`. Skills and abilities get their
//! own contexts based on the character, so their properties resolve relative
//! to whoever owns them.

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use serde::Deserialize;

use super::resources::{MatchResourceSet, ResourceRecord, HIT_POINTS};
use super::targeting::Targeting;
use super::trigger::Trigger;
use crate::context::{Context, ContextRef, Host, Value};
use crate::core::error::{Result, SimError};
use crate::core::types::Position;
use crate::rules::{Definition, Environment};

/// Event points that fire a character's abilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hook {
    Initialize,
    Roll,
    StartOfTurn,
    EndOfTurn,
    DamageDone,
    DamageTaken,
    RemoveFromPlay,
    Ticker,
}

impl Hook {
    /// Read an ability's hook, written as a name or as `{"profile": name}`
    fn from_definition(owner: &str, value: Option<&serde_json::Value>) -> Result<Self> {
        let hook = match value {
            Some(serde_json::Value::Object(object)) => object.get("profile"),
            other => other,
        }
        .cloned()
        .ok_or_else(|| SimError::invalid_definition(owner, "ability has no hook"))?;

        serde_json::from_value(hook).map_err(|e| SimError::invalid_definition(owner, e.to_string()))
    }
}

fn conditions(owner: &str, definition: &Definition) -> Result<Vec<Value>> {
    match definition.get("conditions") {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(serde_json::Value::Array(items)) => Ok(items.iter().map(Value::from).collect()),
        Some(_) => Err(SimError::invalid_definition(owner, "conditions must be a list")),
    }
}

/// A skill as bound to one character
#[derive(Debug, Clone)]
pub struct MatchSkill {
    pub name: String,
    pub context: ContextRef,
    pub conditions: Vec<Value>,
    pub targeting: Targeting,
    pub trigger: Rc<Trigger>,
}

impl MatchSkill {
    pub fn from_definition(name: &str, definition: &Definition, character: &ContextRef) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            context: Context::new(name)
                .with_properties(Value::map_from_json(definition))
                .with_base(character)
                .into_ref(),
            conditions: conditions(name, definition)?,
            targeting: Targeting::from_definition(name, definition.get("targeting"))?,
            trigger: Rc::new(Trigger::from_definition(name, definition.get("trigger"))?),
        })
    }
}

/// An ability waiting on one of its character's hooks
#[derive(Debug, Clone)]
pub struct MatchAbility {
    pub name: String,
    pub hook: Hook,
    pub context: ContextRef,
    pub conditions: Vec<Value>,
    pub targeting: Targeting,
    pub trigger: Rc<Trigger>,
}

impl MatchAbility {
    pub fn from_definition(name: &str, definition: &Definition, character: &ContextRef) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            hook: Hook::from_definition(name, definition.get("hook"))?,
            context: Context::new(name)
                .with_properties(Value::map_from_json(definition))
                .with_base(character)
                .into_ref(),
            conditions: conditions(name, definition)?,
            targeting: Targeting::from_definition(name, definition.get("targeting"))?,
            trigger: Rc::new(Trigger::from_definition(name, definition.get("trigger"))?),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MatchCharacter {
    /// Instance name, unique within the match
    pub name: String,
    /// Definition this character was built from
    pub definition: String,
    pub context: ContextRef,
    pub alignment: String,
    pub position: Position,
    pub resources: MatchResourceSet,
    pub skills: Vec<MatchSkill>,
    pub hooks: AHashMap<Hook, Vec<MatchAbility>>,
    /// Rolled once at build and cached for the whole match
    pub initiative: f64,
    /// Strategy group, from the grouping expression
    pub group: String,
    in_play: bool,
    is_turn: bool,
}

impl MatchCharacter {
    /// Build a character from its definition, scoped under `match_context`.
    ///
    /// Resources and initiative are evaluated here through `host`.
    pub fn build(
        environment: &Environment,
        definition_name: &str,
        instance_name: &str,
        match_context: &ContextRef,
        host: &mut dyn Host,
    ) -> Result<Self> {
        let definition = environment.character(definition_name)?;

        let alignment = match definition.get("alignment") {
            Some(serde_json::Value::String(alignment)) => alignment.clone(),
            Some(_) => {
                return Err(SimError::invalid_definition(
                    definition_name,
                    "alignment must be text",
                ))
            }
            None => {
                return Err(SimError::invalid_definition(
                    definition_name,
                    "missing alignment",
                ))
            }
        };
        let position = parse_position(definition_name, definition.get("position"))?;

        let template = Context::new(definition_name)
            .with_properties(Value::map_from_json(definition))
            .with_base(match_context)
            .into_ref();
        let context = Context::new(instance_name)
            .with_owner(instance_name)
            .with_property("alignment", alignment.as_str())
            .with_property(
                "position",
                Value::List(vec![Value::from(position.x), Value::from(position.y)]),
            )
            .with_property("in_play", true)
            .with_property("is_turn", false)
            .with_base(&template)
            .into_ref();

        let mut skills = Vec::new();
        for skill in Environment::listed_names(definition, definition_name, "skills")? {
            skills.push(MatchSkill::from_definition(
                &skill,
                environment.skill(&skill)?,
                &context,
            )?);
        }

        let mut hooks: AHashMap<Hook, Vec<MatchAbility>> = AHashMap::new();
        for ability in Environment::listed_names(definition, definition_name, "abilities")? {
            let ability =
                MatchAbility::from_definition(&ability, environment.ability(&ability)?, &context)?;
            hooks.entry(ability.hook).or_default().push(ability);
        }

        let resource_names = if definition.contains_key("resources") {
            Environment::listed_names(definition, definition_name, "resources")?
        } else {
            environment.resources.keys().cloned().collect()
        };
        let mut records = Vec::with_capacity(resource_names.len());
        for resource in &resource_names {
            records.push(ResourceRecord::evaluate(
                resource,
                environment.resource(resource)?,
                &context,
                host,
            )?);
        }
        let mut resources = MatchResourceSet::new(records);
        resources.initialize();

        let initiative = roll_initiative(definition_name, definition, &context, host)?;
        // shadows the definition's expression for the rest of the match
        context.set("initiative", initiative);

        tracing::trace!(
            "Built {} ({}) with initiative {}",
            instance_name,
            alignment,
            initiative
        );

        Ok(Self {
            name: instance_name.to_string(),
            definition: definition_name.to_string(),
            context,
            alignment,
            position,
            resources,
            skills,
            hooks,
            initiative,
            group: String::new(),
            in_play: true,
            is_turn: false,
        })
    }

    pub fn in_play(&self) -> bool {
        self.in_play
    }

    pub fn is_turn(&self) -> bool {
        self.is_turn
    }

    pub fn set_in_play(&mut self, in_play: bool) {
        self.in_play = in_play;
        self.context.set("in_play", in_play);
    }

    pub fn set_turn(&mut self, is_turn: bool) {
        self.is_turn = is_turn;
        self.context.set("is_turn", is_turn);
    }

    pub fn has_hook(&self, hook: Hook) -> bool {
        self.hooks.get(&hook).is_some_and(|abilities| !abilities.is_empty())
    }

    pub fn skill_names(&self) -> Vec<String> {
        self.skills.iter().map(|skill| skill.name.clone()).collect()
    }
}

fn parse_position(owner: &str, value: Option<&serde_json::Value>) -> Result<Position> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(Position::default()),
        Some(serde_json::Value::Array(items)) if items.len() == 2 => {
            match (items[0].as_i64(), items[1].as_i64()) {
                (Some(x), Some(y)) => Ok(Position::new(x, y)),
                _ => Err(SimError::invalid_definition(owner, "position must be integers")),
            }
        }
        Some(_) => Err(SimError::invalid_definition(owner, "position must be [x, y]")),
    }
}

/// The definition's `initiative` expression, or 1d20 plus `initiative_bonus`
fn roll_initiative(
    owner: &str,
    definition: &Definition,
    context: &ContextRef,
    host: &mut dyn Host,
) -> Result<f64> {
    let as_number = |value: Value, what: &str| match value {
        Value::Number(n) => Ok(n),
        Value::Null => Ok(0.0),
        other => Err(SimError::invalid_definition(
            owner,
            format!("{} must be a number, got {}", what, other.type_name()),
        )),
    };

    if let Some(expression) = definition.get("initiative") {
        let value = context.eval(&Value::from(expression), host)?;
        return as_number(value, "initiative");
    }

    let bonus = match definition.get("initiative_bonus") {
        Some(expression) => as_number(context.eval(&Value::from(expression), host)?, "initiative_bonus")?,
        None => 0.0,
    };
    Ok(host.roll(context, 1, 20)? as f64 + bonus)
}

impl fmt::Display for MatchCharacter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.position)?;
        if let (Ok(quantity), Ok(max)) = (
            self.resources.quantity(HIT_POINTS),
            self.resources.max_quantity(HIT_POINTS),
        ) {
            write!(f, ": {}/{}", quantity, max)?;
        }
        if !self.in_play {
            write!(f, " [out]")?;
        }
        Ok(())
    }
}
