use serde::Deserialize;

use super::effects::Effect;
use crate::context::Value;
use crate::core::error::{Result, SimError};

/// Conditions and effect lists fired by an action or a hook.
///
/// When the conditions hold the success effects run, otherwise the failure
/// effects; the plain `effects` always run afterwards.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Trigger {
    pub conditions: Vec<Value>,
    pub effects: Vec<Effect>,
    pub success_effects: Vec<Effect>,
    pub failure_effects: Vec<Effect>,
}

impl Trigger {
    pub fn from_definition(owner: &str, value: Option<&serde_json::Value>) -> Result<Self> {
        match value {
            None | Some(serde_json::Value::Null) => Ok(Self::default()),
            Some(value) => Trigger::deserialize(value)
                .map_err(|e| SimError::invalid_definition(owner, e.to_string())),
        }
    }

    /// Trigger of the synthetic abstain action: end the turn, nothing else
    pub fn abstain() -> Self {
        Self {
            effects: vec![Effect::EndTurn { target: None }],
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_lists_default_to_empty() {
        let trigger = Trigger::from_definition(
            "bite",
            Some(&json!({ "effects": [{ "profile": "end-turn" }] })),
        )
        .unwrap();

        assert!(trigger.conditions.is_empty());
        assert!(trigger.success_effects.is_empty());
        assert_eq!(trigger.effects, vec![Effect::EndTurn { target: None }]);
        assert_eq!(Trigger::from_definition("bite", None).unwrap(), Trigger::default());
    }

    #[test]
    fn test_unknown_effect_rejected() {
        assert!(matches!(
            Trigger::from_definition("bite", Some(&json!({ "effects": [{ "profile": "teleport" }] }))),
            Err(SimError::InvalidDefinition { .. })
        ));
    }
}
