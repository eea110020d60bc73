//! The seam between actions and the remote execution service.

use crate::error::Result;
use goal_client::{GoalClient, GoalClientError, GoalSpec, GoalStatus};

/// A client to an asynchronous, cancelable, goal-accepting service.
///
/// Implementations track at most one goal at a time and must bound the
/// latency of every call; the driving loop inherits any stall.
pub trait ExecutionHandle: Send + Sync {
    /// Submit `goal` and start tracking it.
    fn submit_goal(&self, goal: &GoalSpec) -> Result<()>;

    /// Status of the tracked goal, or `None` when nothing is tracked.
    fn goal_status(&self) -> Result<Option<GoalStatus>>;

    /// Cancel every pending or active goal.
    fn cancel_goals(&self) -> Result<()>;

    /// Whether a goal is currently tracked.
    fn has_goal(&self) -> bool;

    /// Stop tracking the current goal without canceling it.
    fn release_goal(&self);
}

impl ExecutionHandle for GoalClient {
    fn submit_goal(&self, goal: &GoalSpec) -> Result<()> {
        self.submit(goal)?;
        Ok(())
    }

    fn goal_status(&self) -> Result<Option<GoalStatus>> {
        match self.status() {
            Ok(status) => Ok(Some(status)),
            Err(GoalClientError::NoGoalTracked) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn cancel_goals(&self) -> Result<()> {
        self.cancel_all()?;
        Ok(())
    }

    fn has_goal(&self) -> bool {
        self.is_tracking()
    }

    fn release_goal(&self) {
        self.stop_tracking();
    }
}
