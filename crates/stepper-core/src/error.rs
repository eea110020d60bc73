use crate::types::ActionState;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StepperError {
    #[error("not initialized: run 'stepper init'")]
    NotInitialized,

    #[error("action not found: {0}")]
    ActionNotFound(String),

    #[error("definition file for action '{0}' does not exist")]
    DefinitionMissing(String),

    #[error("invalid action id '{0}': use letters, digits, '_', '-' or '.'")]
    InvalidActionId(String),

    #[error("invalid action definition '{}': {reason}", .path.display())]
    DefinitionInvalid { path: PathBuf, reason: String },

    #[error("script '{}' failed: {reason}", .path.display())]
    ScriptExecution { path: PathBuf, reason: String },

    #[error("script '{}' did not produce an `action`", .0.display())]
    ScriptContract(PathBuf),

    #[error("no runtime for script: '{0}' is not installed")]
    NoScriptRuntime(String),

    #[error("action '{id}' is not runnable (state: {state})")]
    NotRunnable { id: String, state: ActionState },

    #[error("cannot start an action in state {0}")]
    NotStartable(ActionState),

    #[error("internal contract violated: {0}")]
    InternalContract(String),

    #[error("action slot lock poisoned")]
    SlotPoisoned,

    #[error(transparent)]
    Remote(#[from] goal_client::GoalClientError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StepperError>;
