//! Runnable actions.
//!
//! An [`Action`] is the unit the dispatcher owns: it is built in
//! `Initialized` (or `Uninitialized` for a malformed definition), started
//! once by the driving loop, and then tracks its goal on the execution
//! service until it reaches `Succeeded` or `Error`.

use crate::error::{Result, StepperError};
use crate::remote::ExecutionHandle;
use crate::types::ActionState;
use goal_client::{GoalSpec, GoalStatus};
use std::sync::Arc;
use tracing::{error, info, warn};

/// The capability every action format produces.
pub trait Action: Send {
    /// Last known state. Never talks to the execution service.
    fn state(&self) -> ActionState;

    /// Reconcile with the execution service and return the new state.
    /// Terminal states are latched. Only the driving loop calls this.
    fn poll(&mut self) -> ActionState;

    /// Submit the work. Only valid in `Initialized`; on failure the action
    /// must report `Error` afterwards.
    fn start(&mut self) -> Result<()>;

    /// Cancel any pending or active goal and release tracking. Idempotent,
    /// callable in any state.
    fn stop(&mut self);
}

// ---------------------------------------------------------------------------
// GoalAction
// ---------------------------------------------------------------------------

/// An action that submits a single goal.
pub struct GoalAction {
    goal: GoalSpec,
    handle: Arc<dyn ExecutionHandle>,
    state: ActionState,
    submitted: bool,
    stopped: bool,
}

impl GoalAction {
    /// Starts `Initialized` when `goal` is structurally valid, otherwise
    /// `Uninitialized`.
    pub fn new(goal: GoalSpec, handle: Arc<dyn ExecutionHandle>) -> Self {
        let state = if goal.is_valid() {
            ActionState::Initialized
        } else {
            ActionState::Uninitialized
        };
        Self {
            goal,
            handle,
            state,
            submitted: false,
            stopped: false,
        }
    }

    fn reconcile(&mut self) {
        match self.handle.goal_status() {
            Ok(Some(GoalStatus::Succeeded)) => {
                info!("goal succeeded");
                self.state = ActionState::Succeeded;
            }
            Ok(Some(status)) if status.is_cancelable() => {}
            Ok(Some(status)) => {
                warn!(%status, "goal ended without success");
                self.state = ActionState::Error;
            }
            Ok(None) => {
                error!("submitted goal is no longer tracked");
                self.state = ActionState::Error;
            }
            Err(e) => {
                error!(error = %e, "cannot query goal status");
                self.state = ActionState::Error;
            }
        }
    }
}

impl Action for GoalAction {
    fn state(&self) -> ActionState {
        self.state
    }

    fn poll(&mut self) -> ActionState {
        if self.state == ActionState::Running && !self.stopped {
            self.reconcile();
        }
        self.state
    }

    fn start(&mut self) -> Result<()> {
        if self.state != ActionState::Initialized || self.stopped {
            return Err(StepperError::NotStartable(self.state));
        }
        match self.handle.submit_goal(&self.goal) {
            Ok(()) => {
                self.submitted = true;
                self.state = ActionState::Running;
                info!(steps = self.goal.steps.len(), "goal submitted");
                Ok(())
            }
            Err(e) => {
                self.state = ActionState::Error;
                Err(e)
            }
        }
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if !self.submitted || !self.handle.has_goal() {
            return;
        }

        let cancel = match self.handle.goal_status() {
            Ok(Some(status)) => status.is_cancelable(),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "cannot query goal status, canceling anyway");
                true
            }
        };
        if cancel {
            warn!("canceling action");
            if let Err(e) = self.handle.cancel_goals() {
                error!(error = %e, "cancel request failed");
            }
        }
        self.handle.release_goal();
    }
}

impl Drop for GoalAction {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
