//! Load resolved scenario documents from JSON

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::core::config::StrategyConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::Board;
use crate::rules::environment::Environment;

fn one() -> u32 {
    1
}

/// Parameters of one encounter: the board and which characters take part
#[derive(Debug, Clone, Deserialize)]
pub struct MatchSetup {
    #[serde(default = "one")]
    pub board_width: u32,
    #[serde(default = "one")]
    pub board_height: u32,
    /// Character definition names; a name listed twice fields two characters
    pub characters: Vec<String>,
    /// Anything else on the setup becomes a property of the match context
    #[serde(flatten)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl MatchSetup {
    pub fn new(characters: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            board_width: 1,
            board_height: 1,
            characters: characters.into_iter().map(Into::into).collect(),
            properties: serde_json::Map::new(),
        }
    }

    pub fn board(&self) -> Board {
        Board {
            width: self.board_width,
            height: self.board_height,
        }
    }

    /// `(definition, instance name)` for every participant. Repeated
    /// definitions get numbered instance names so names stay unique.
    pub fn instances(&self) -> Vec<(String, String)> {
        let mut seen: BTreeMap<&str, usize> = BTreeMap::new();

        self.characters
            .iter()
            .map(|definition| {
                let count = seen.entry(definition.as_str()).or_insert(0);
                *count += 1;
                let instance = if *count == 1 {
                    definition.clone()
                } else {
                    format!("{} {}", definition, count)
                };
                (definition.clone(), instance)
            })
            .collect()
    }
}

/// A whole scenario file: definitions, games, and optimizer settings
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(flatten)]
    pub environment: Environment,
    #[serde(default, alias = "matches")]
    pub games: BTreeMap<String, MatchSetup>,
    /// Selected game; may be omitted when only one is defined
    #[serde(default, alias = "match")]
    pub game: Option<String>,
    #[serde(default)]
    pub strategy: StrategyConfig,
}

impl Scenario {
    /// The selected game and its name
    pub fn selected_game(&self) -> Result<(&str, &MatchSetup)> {
        match &self.game {
            Some(name) => self
                .games
                .get_key_value(name)
                .map(|(name, setup)| (name.as_str(), setup))
                .ok_or_else(|| SimError::UnknownGame(name.clone())),
            None if self.games.len() == 1 => self
                .games
                .iter()
                .next()
                .map(|(name, setup)| (name.as_str(), setup))
                .ok_or_else(|| SimError::UnknownGame(String::new())),
            None => Err(SimError::InvalidConfig(format!(
                "no game selected among {} games",
                self.games.len()
            ))),
        }
    }

    /// Fail fast on names the selected game cannot resolve
    pub fn validate(&self) -> Result<()> {
        self.strategy.validate().map_err(SimError::InvalidConfig)?;

        let (_, setup) = self.selected_game()?;
        for definition in &setup.characters {
            self.environment.validate_character(definition)?;
        }

        Ok(())
    }
}

/// Parse a scenario document
pub fn parse_scenario(content: &str) -> Result<Scenario> {
    let scenario: Scenario = serde_json::from_str(content)?;
    scenario.validate()?;
    Ok(scenario)
}

/// Load and validate a scenario file
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let content = fs::read_to_string(path)?;
    let scenario = parse_scenario(&content)?;

    tracing::info!(
        "Loaded scenario {} ({} characters, {} skills, {} abilities, {} resources)",
        path.display(),
        scenario.environment.characters.len(),
        scenario.environment.skills.len(),
        scenario.environment.abilities.len(),
        scenario.environment.resources.len()
    );

    Ok(scenario)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> serde_json::Value {
        json!({
            "characters": {
                "fighter": { "alignment": "good" },
                "goblin": { "alignment": "evil" }
            },
            "resources": { "hit_points": { "max_quantity": 8 } },
            "games": {
                "ambush": {
                    "board_width": 5,
                    "board_height": 4,
                    "characters": ["fighter", "goblin", "goblin"],
                    "terrain": "forest"
                }
            },
            "strategy": { "maximum_turns": 4 }
        })
    }

    #[test]
    fn test_parse_scenario() {
        let scenario = parse_scenario(&document().to_string()).unwrap();
        let (name, setup) = scenario.selected_game().unwrap();

        assert_eq!(name, "ambush");
        assert_eq!(setup.board(), Board { width: 5, height: 4 });
        assert_eq!(setup.properties["terrain"], json!("forest"));
        assert_eq!(scenario.strategy.maximum_turns, 4);
        assert_eq!(scenario.strategy.novel_strategy_count, 10);
        assert_eq!(scenario.environment.resources.len(), 1);
    }

    #[test]
    fn test_repeated_definitions_get_numbered() {
        let setup = MatchSetup::new(["fighter", "goblin", "goblin"]);
        let names: Vec<String> = setup.instances().into_iter().map(|(_, n)| n).collect();
        assert_eq!(names, vec!["fighter", "goblin", "goblin 2"]);
    }

    #[test]
    fn test_unknown_character_fails_fast() {
        let mut doc = document();
        doc["games"]["ambush"]["characters"] = json!(["fighter", "dragon"]);

        assert!(matches!(
            parse_scenario(&doc.to_string()),
            Err(SimError::UnknownCharacter(name)) if name == "dragon"
        ));
    }

    #[test]
    fn test_game_selection() {
        let mut doc = document();
        doc["games"]["duel"] = json!({ "characters": ["fighter"] });
        assert!(matches!(
            parse_scenario(&doc.to_string()),
            Err(SimError::InvalidConfig(_))
        ));

        doc["game"] = json!("duel");
        let scenario = parse_scenario(&doc.to_string()).unwrap();
        assert_eq!(scenario.selected_game().unwrap().0, "duel");

        doc["game"] = json!("siege");
        assert!(matches!(
            parse_scenario(&doc.to_string()),
            Err(SimError::UnknownGame(_))
        ));
    }

    #[test]
    fn test_invalid_strategy_block() {
        let mut doc = document();
        doc["strategy"]["simulations_per_generation"] = json!(0);
        assert!(matches!(
            parse_scenario(&doc.to_string()),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_scenario(Path::new("/nonexistent/scenario.json")),
            Err(SimError::IoError(_))
        ));
    }
}
