//! Static definitions shared by every match of a scenario

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::core::error::{Result, SimError};

/// One resolved definition record (a character, skill, ability or resource)
pub type Definition = serde_json::Map<String, serde_json::Value>;

/// Read-only registry of definitions, keyed by name.
///
/// Holds plain JSON so it can be shared across parallel trials; contexts are
/// built from it per match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub characters: BTreeMap<String, Definition>,
    #[serde(default)]
    pub skills: BTreeMap<String, Definition>,
    #[serde(default)]
    pub abilities: BTreeMap<String, Definition>,
    #[serde(default)]
    pub resources: BTreeMap<String, Definition>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn character(&self, name: &str) -> Result<&Definition> {
        self.characters
            .get(name)
            .ok_or_else(|| SimError::UnknownCharacter(name.to_string()))
    }

    pub fn skill(&self, name: &str) -> Result<&Definition> {
        self.skills
            .get(name)
            .ok_or_else(|| SimError::UnknownSkill(name.to_string()))
    }

    pub fn ability(&self, name: &str) -> Result<&Definition> {
        self.abilities
            .get(name)
            .ok_or_else(|| SimError::UnknownAbility(name.to_string()))
    }

    pub fn resource(&self, name: &str) -> Result<&Definition> {
        self.resources
            .get(name)
            .ok_or_else(|| SimError::UnknownResource(name.to_string()))
    }

    /// Names listed under `key` in a character definition (`skills`,
    /// `abilities`, `resources`). Absent means none.
    pub fn listed_names(definition: &Definition, owner: &str, key: &str) -> Result<Vec<String>> {
        match definition.get(key) {
            None | Some(serde_json::Value::Null) => Ok(Vec::new()),
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        SimError::invalid_definition(owner, format!("{} must list names", key))
                    })
                })
                .collect(),
            Some(_) => Err(SimError::invalid_definition(
                owner,
                format!("{} must be a list", key),
            )),
        }
    }

    /// Check that every name a character refers to is defined
    pub fn validate_character(&self, name: &str) -> Result<()> {
        let definition = self.character(name)?;

        for skill in Self::listed_names(definition, name, "skills")? {
            self.skill(&skill)?;
        }
        for ability in Self::listed_names(definition, name, "abilities")? {
            self.ability(&ability)?;
        }
        for resource in Self::listed_names(definition, name, "resources")? {
            self.resource(&resource)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn environment() -> Environment {
        serde_json::from_value(json!({
            "characters": {
                "knight": { "alignment": "good", "skills": ["slash"], "resources": ["hit_points"] },
                "ghost": { "alignment": "evil", "skills": ["wail"] }
            },
            "skills": { "slash": { "targeting": { "profile": "single-target" } } },
            "resources": { "hit_points": { "max_quantity": 10 } }
        }))
        .unwrap()
    }

    #[test]
    fn test_lookup_by_name() {
        let env = environment();
        assert!(env.character("knight").is_ok());
        assert!(matches!(
            env.character("dragon"),
            Err(SimError::UnknownCharacter(name)) if name == "dragon"
        ));
        assert!(env.abilities.is_empty());
    }

    #[test]
    fn test_validate_catches_missing_skill() {
        let env = environment();
        assert!(env.validate_character("knight").is_ok());
        assert!(matches!(
            env.validate_character("ghost"),
            Err(SimError::UnknownSkill(name)) if name == "wail"
        ));
    }

    #[test]
    fn test_listed_names_rejects_non_lists() {
        let definition = json!({ "skills": "slash" });
        let definition = definition.as_object().unwrap();
        assert!(Environment::listed_names(definition, "x", "skills").is_err());
        assert!(Environment::listed_names(definition, "x", "abilities")
            .unwrap()
            .is_empty());
    }
}
