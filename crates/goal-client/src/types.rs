use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Goal specification ───────────────────────────────────────────────────

/// How the execution service should treat a goal that is still running when
/// a new goal (or a cancel request) arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreemptionMode {
    #[default]
    PreemptImmediate,
    StopAtNextStep,
    NoPreempt,
}

/// A single motion inside a step, e.g. `footstep` or `base_auto`.
///
/// `params` is forwarded verbatim; the execution service owns its meaning.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Motion {
    pub kind: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// One step of a goal: motions that execute together.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Step {
    pub motions: Vec<Motion>,
}

/// The unit of work submitted to the execution service.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct GoalSpec {
    #[serde(default)]
    pub preempt: PreemptionMode,
    pub steps: Vec<Step>,
}

impl GoalSpec {
    /// A goal is structurally valid when it has at least one step and every
    /// step carries at least one named motion.
    pub fn is_valid(&self) -> bool {
        !self.steps.is_empty()
            && self.steps.iter().all(|s| {
                !s.motions.is_empty() && s.motions.iter().all(|m| !m.kind.trim().is_empty())
            })
    }
}

// ─── Goal status ──────────────────────────────────────────────────────────

/// Status of the tracked goal as reported by the execution service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Pending,
    Active,
    Preempted,
    Succeeded,
    Aborted,
    Rejected,
    Recalled,
    /// The service no longer knows the goal.
    Lost,
}

impl GoalStatus {
    /// Pending or active goals can still be canceled.
    pub fn is_cancelable(self) -> bool {
        matches!(self, GoalStatus::Pending | GoalStatus::Active)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_cancelable()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GoalStatus::Pending => "pending",
            GoalStatus::Active => "active",
            GoalStatus::Preempted => "preempted",
            GoalStatus::Succeeded => "succeeded",
            GoalStatus::Aborted => "aborted",
            GoalStatus::Rejected => "rejected",
            GoalStatus::Recalled => "recalled",
            GoalStatus::Lost => "lost",
        }
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Wire payloads ────────────────────────────────────────────────────────

/// Body of `POST /goals`.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest<'a> {
    pub goal_id: &'a str,
    pub goal: &'a GoalSpec,
}

/// Body of `GET /goals/{goal_id}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusResponse {
    pub goal_id: String,
    pub status: GoalStatus,
}
