use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ActionFormat
// ---------------------------------------------------------------------------

/// How an action's definition file is turned into a runnable action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionFormat {
    /// A YAML file describing the goal's steps.
    #[serde(rename = "yaml", alias = "declarative")]
    Declarative,
    /// An executable script that prints the goal as JSON.
    #[serde(rename = "script")]
    Script,
}

impl ActionFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionFormat::Declarative => "yaml",
            ActionFormat::Script => "script",
        }
    }
}

impl fmt::Display for ActionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ActionState
// ---------------------------------------------------------------------------

/// Lifecycle state of a runnable action.
///
/// Transitions: `Initialized → Running → Succeeded | Error`
///
/// `Uninitialized` marks a malformed definition and never moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    Uninitialized,
    Initialized,
    Running,
    Succeeded,
    Error,
}

impl ActionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionState::Uninitialized => "uninitialized",
            ActionState::Initialized => "initialized",
            ActionState::Running => "running",
            ActionState::Succeeded => "succeeded",
            ActionState::Error => "error",
        }
    }

    /// States that must never be installed in the dispatcher.
    pub fn is_failed(self) -> bool {
        matches!(self, ActionState::Uninitialized | ActionState::Error)
    }
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SendStatus
// ---------------------------------------------------------------------------

/// Outcome of a send request. Callers always receive exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SendStatus {
    Success,
    NotFound,
    Error,
    Unknown,
}

impl SendStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SendStatus::Success => "SUCCESS",
            SendStatus::NotFound => "NOT_FOUND",
            SendStatus::Error => "ERROR",
            SendStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for SendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSummary {
    pub id: String,
    pub name: String,
    pub group: String,
    pub format: ActionFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub id: String,
    pub name: String,
    pub action_ids: Vec<String>,
}

/// Snapshot of the dispatcher's action slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveAction {
    pub id: String,
    pub state: ActionState,
    pub started_at: Option<DateTime<Utc>>,
}
