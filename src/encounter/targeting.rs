//! Target selection for skills and hooks

use super::character::MatchCharacter;
use crate::core::error::{Result, SimError};

/// Which characters a skill or ability may be aimed at
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Targeting {
    /// Only the acting character
    #[default]
    SelfTarget,
    /// Any other character still in play
    SingleTarget,
    /// Like `SingleTarget`, limited to `range` board units when given
    Ranged { range: Option<f64> },
}

impl Targeting {
    /// Parse a `{"profile": ...}` targeting block. Absent means self.
    pub fn from_definition(owner: &str, value: Option<&serde_json::Value>) -> Result<Self> {
        let Some(value) = value.filter(|v| !v.is_null()) else {
            return Ok(Targeting::SelfTarget);
        };

        let profile = value.get("profile").and_then(|p| p.as_str()).unwrap_or("self");
        match profile {
            "self" => Ok(Targeting::SelfTarget),
            "single-target" => Ok(Targeting::SingleTarget),
            "ranged" => Ok(Targeting::Ranged {
                range: value.get("range").and_then(|r| r.as_f64()),
            }),
            other => Err(SimError::invalid_definition(
                owner,
                format!("unknown targeting profile {}", other),
            )),
        }
    }

    /// Indices of eligible targets for the character at `actor`
    pub fn targets(&self, actor: usize, characters: &[MatchCharacter]) -> Vec<usize> {
        match self {
            Targeting::SelfTarget => vec![actor],
            Targeting::SingleTarget => others_in_play(actor, characters).collect(),
            Targeting::Ranged { range } => {
                let origin = characters[actor].position;
                others_in_play(actor, characters)
                    .filter(|&index| match range {
                        Some(range) => origin.distance(&characters[index].position) <= *range,
                        None => true,
                    })
                    .collect()
            }
        }
    }
}

fn others_in_play(actor: usize, characters: &[MatchCharacter]) -> impl Iterator<Item = usize> + '_ {
    characters
        .iter()
        .enumerate()
        .filter(move |(index, character)| *index != actor && character.in_play())
        .map(|(index, _)| index)
}
