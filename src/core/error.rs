use thiserror::Error;

use crate::context::EvalError;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Unknown character definition: {0}")]
    UnknownCharacter(String),

    #[error("Unknown skill definition: {0}")]
    UnknownSkill(String),

    #[error("Unknown ability definition: {0}")]
    UnknownAbility(String),

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Unknown game: {0}")]
    UnknownGame(String),

    #[error("Unknown strategy group: {0}")]
    UnknownStrategy(String),

    #[error("Invalid definition for {name}: {reason}")]
    InvalidDefinition { name: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Hook recursion exceeded {0} levels")]
    HookRecursion(usize),

    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl SimError {
    pub fn invalid_definition(name: impl Into<String>, reason: impl Into<String>) -> Self {
        SimError::InvalidDefinition {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
