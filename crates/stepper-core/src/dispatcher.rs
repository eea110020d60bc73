//! The single action slot and the control operations around it.
//!
//! Request handlers call [`Dispatcher::send_action`], [`Dispatcher::reset`]
//! and the list operations concurrently; the driving loop calls
//! [`Dispatcher::advance`]. `send_action` and `reset` are serialized through
//! the control lock. The slot lock is only held for short critical sections,
//! with one exception: `advance` holds it across `start()` so a concurrent
//! reset waits for the submission and then cancels it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::action::Action;
use crate::builder::ActionBuilder;
use crate::catalog::{ActionDescriptor, Catalog};
use crate::error::{Result, StepperError};
use crate::paths;
use crate::remote::ExecutionHandle;
use crate::types::{ActionState, ActionSummary, ActiveAction, CollectionSummary, SendStatus};

struct Slot {
    id: String,
    action: Box<dyn Action>,
    started_at: Option<DateTime<Utc>>,
}

pub struct Dispatcher {
    catalog: RwLock<Catalog>,
    builder: Box<dyn ActionBuilder>,
    handle: Arc<dyn ExecutionHandle>,
    control: Mutex<()>,
    slot: Mutex<Option<Slot>>,
}

impl Dispatcher {
    pub fn new(
        catalog: Catalog,
        builder: Box<dyn ActionBuilder>,
        handle: Arc<dyn ExecutionHandle>,
    ) -> Self {
        Self {
            catalog: RwLock::new(catalog),
            builder,
            handle,
            control: Mutex::new(()),
            slot: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Discovery
    // -----------------------------------------------------------------------

    /// Rescan actions and collections. `true` only if both scans succeeded.
    pub fn update(&self) -> bool {
        let mut catalog = self.catalog.write().unwrap_or_else(PoisonError::into_inner);
        let ok = catalog.update();
        info!(
            actions = catalog.actions().len(),
            success = ok,
            "catalog updated"
        );
        ok
    }

    /// Actions sorted by id. An empty `collection_id` means no filter; an
    /// unknown one yields an empty list.
    pub fn list_actions(&self, collection_id: Option<&str>) -> Vec<ActionSummary> {
        let filter = collection_id.filter(|c| !c.is_empty());
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .list_actions(filter)
    }

    /// The full descriptor for `id`, whether or not its file exists.
    pub fn describe(&self, id: &str) -> Result<ActionDescriptor> {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .actions()
            .get(id)
            .cloned()
            .ok_or_else(|| StepperError::ActionNotFound(id.to_string()))
    }

    pub fn list_collections(&self) -> Vec<CollectionSummary> {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .list_collections()
    }

    // -----------------------------------------------------------------------
    // Control
    // -----------------------------------------------------------------------

    /// Replace the current action with `id`. Always answers with one of the
    /// four statuses; the previous action is torn down first regardless of
    /// the outcome.
    pub fn send_action(&self, id: &str) -> SendStatus {
        let _control = self.control.lock().unwrap_or_else(PoisonError::into_inner);
        self.teardown();

        match self.load(id) {
            Ok(action) => {
                *self.lock_slot() = Some(Slot {
                    id: id.to_string(),
                    action,
                    started_at: None,
                });
                info!(action = %id, "action installed");
                SendStatus::Success
            }
            Err(e) => {
                let status = status_for(&e);
                match status {
                    SendStatus::NotFound => warn!(action = %id, error = %e, "action not found"),
                    SendStatus::Unknown => {
                        error!(action = %id, error = %e, "action loading violated its contract")
                    }
                    _ => error!(action = %id, error = %e, "cannot load action"),
                }
                status
            }
        }
    }

    fn load(&self, id: &str) -> Result<Box<dyn Action>> {
        paths::validate_action_id(id)?;
        let descriptor = self
            .catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .resolve(id)?
            .clone();

        let mut action = self.builder.build(&descriptor)?.ok_or_else(|| {
            StepperError::InternalContract(format!("builder produced no action for '{id}'"))
        })?;

        let state = action.state();
        if state.is_failed() {
            action.stop();
            return Err(StepperError::NotRunnable {
                id: id.to_string(),
                state,
            });
        }
        Ok(action)
    }

    /// Reconcile the installed action and start it if it is `Initialized`.
    ///
    /// The only place actions are started or polled. A failed start is
    /// logged and leaves the action in `Error`; only a poisoned slot is
    /// returned.
    pub fn advance(&self) -> Result<()> {
        let mut guard = self.slot.lock().map_err(|_| StepperError::SlotPoisoned)?;
        let Some(slot) = guard.as_mut() else {
            return Ok(());
        };
        if slot.action.poll() != ActionState::Initialized {
            return Ok(());
        }

        info!(action = %slot.id, "starting action");
        match slot.action.start() {
            Ok(()) => slot.started_at = Some(Utc::now()),
            Err(e) => error!(action = %slot.id, error = %e, "cannot start action"),
        }
        Ok(())
    }

    /// Stop and drop the current action, then release any goal the handle
    /// still tracks. Idempotent.
    pub fn reset(&self) {
        let _control = self.control.lock().unwrap_or_else(PoisonError::into_inner);
        self.teardown();
    }

    fn teardown(&self) {
        let previous = self.lock_slot().take();
        if let Some(mut slot) = previous {
            info!(action = %slot.id, "stopping action");
            slot.action.stop();
        }
        if self.handle.has_goal() {
            self.handle.release_goal();
        }
    }

    /// Cancel the tracked goal if it is still pending or active. Used on
    /// shutdown; never fails.
    pub fn preempt(&self) {
        if !self.handle.has_goal() {
            return;
        }
        match self.handle.goal_status() {
            Ok(Some(status)) if status.is_cancelable() => {
                warn!(%status, "preempting action");
                if let Err(e) = self.handle.cancel_goals() {
                    error!(error = %e, "cannot cancel goal");
                }
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "cannot query goal status during preempt"),
        }
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    /// The installed action and its last polled state.
    pub fn active(&self) -> Option<ActiveAction> {
        self.lock_slot().as_ref().map(|slot| ActiveAction {
            id: slot.id.clone(),
            state: slot.action.state(),
            started_at: slot.started_at,
        })
    }

    #[cfg(test)]
    fn has_action(&self) -> bool {
        self.lock_slot().is_some()
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<Slot>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Map a load failure to the status reported to the caller.
pub fn status_for(err: &StepperError) -> SendStatus {
    match err {
        StepperError::ActionNotFound(_)
        | StepperError::DefinitionMissing(_)
        | StepperError::InvalidActionId(_) => SendStatus::NotFound,
        StepperError::DefinitionInvalid { .. }
        | StepperError::ScriptExecution { .. }
        | StepperError::ScriptContract(_)
        | StepperError::NoScriptRuntime(_)
        | StepperError::NotRunnable { .. }
        | StepperError::Io(_)
        | StepperError::Yaml(_)
        | StepperError::Json(_) => SendStatus::Error,
        _ => SendStatus::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::tests::FakeHandle;
    use crate::builder::DefinitionBuilder;
    use goal_client::GoalStatus;
    use std::path::Path;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    const ACTIONS: &str = r#"
actions:
  - id: valid-action
    file: valid.yaml
    type: yaml
  - id: other-action
    file: other.yaml
    type: yaml
  - id: bad-yaml-action
    file: bad.yaml
    type: yaml
  - id: empty-steps
    file: empty.yaml
    type: yaml
  - id: ghost
    file: missing.yaml
    type: yaml
"#;

    fn fixture() -> (TempDir, Arc<FakeHandle>, Dispatcher) {
        let dir = TempDir::new().unwrap();
        let pkg = dir.path().join("basic");
        std::fs::create_dir_all(&pkg).unwrap();
        std::fs::write(pkg.join("actions.yaml"), ACTIONS).unwrap();
        std::fs::write(
            pkg.join("collections.yaml"),
            "collections:\n  - id: walking\n    actions: [valid-action, other-action]\n",
        )
        .unwrap();
        std::fs::write(pkg.join("valid.yaml"), "steps:\n  - [base_auto]\n").unwrap();
        std::fs::write(pkg.join("other.yaml"), "steps:\n  - [footstep]\n").unwrap();
        std::fs::write(pkg.join("bad.yaml"), "just: a mapping\n").unwrap();
        std::fs::write(pkg.join("empty.yaml"), "steps: []\n").unwrap();

        let handle = Arc::new(FakeHandle::default());
        let dispatcher = dispatcher_over(dir.path(), handle.clone());
        (dir, handle, dispatcher)
    }

    fn dispatcher_over(root: &Path, handle: Arc<FakeHandle>) -> Dispatcher {
        let catalog = Catalog::open(vec![root.to_path_buf()]);
        let builder = DefinitionBuilder::new(handle.clone(), Duration::from_secs(10));
        Dispatcher::new(catalog, Box::new(builder), handle)
    }

    fn state(d: &Dispatcher) -> Option<ActionState> {
        d.active().map(|a| a.state)
    }

    #[test]
    fn unknown_id_is_not_found() {
        let (_dir, _handle, d) = fixture();
        assert_eq!(d.send_action("walk-forward"), SendStatus::NotFound);
        assert!(!d.has_action());
    }

    #[test]
    fn missing_file_and_bad_id_are_not_found() {
        let (_dir, _handle, d) = fixture();
        assert_eq!(d.send_action("ghost"), SendStatus::NotFound);
        assert_eq!(d.send_action("../etc/passwd"), SendStatus::NotFound);
        assert!(!d.has_action());
    }

    #[test]
    fn definition_without_goal_is_error() {
        let (_dir, handle, d) = fixture();
        assert_eq!(d.send_action("bad-yaml-action"), SendStatus::Error);
        assert_eq!(d.send_action("empty-steps"), SendStatus::Error);
        assert!(!d.has_action());
        d.advance().unwrap();
        assert_eq!(handle.submits(), 0);
    }

    #[test]
    fn valid_action_starts_on_next_advance() {
        let (_dir, handle, d) = fixture();
        assert_eq!(d.send_action("valid-action"), SendStatus::Success);
        assert_eq!(state(&d), Some(ActionState::Initialized));
        assert_eq!(handle.submits(), 0);

        d.advance().unwrap();
        assert_eq!(state(&d), Some(ActionState::Running));
        assert_eq!(handle.submits(), 1);
        assert!(d.active().unwrap().started_at.is_some());

        // Further ticks never submit again.
        d.advance().unwrap();
        d.advance().unwrap();
        assert_eq!(handle.submits(), 1);
    }

    #[test]
    fn advance_ignores_terminal_states() {
        let (_dir, handle, d) = fixture();
        d.send_action("valid-action");
        d.advance().unwrap();
        handle.set_status(GoalStatus::Succeeded);
        d.advance().unwrap();
        assert_eq!(state(&d), Some(ActionState::Succeeded));
        d.advance().unwrap();
        assert_eq!(handle.submits(), 1);
    }

    #[test]
    fn active_reports_last_polled_state() {
        let (_dir, handle, d) = fixture();
        d.send_action("valid-action");
        d.advance().unwrap();
        handle.set_status(GoalStatus::Aborted);

        assert_eq!(state(&d), Some(ActionState::Running));
        assert_eq!(state(&d), Some(ActionState::Running));
        d.advance().unwrap();
        assert_eq!(state(&d), Some(ActionState::Error));
    }

    #[test]
    fn ids_may_start_with_punctuation() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("actions.yaml"),
            "actions:\n  - id: _crouch\n    file: crouch.yaml\n    type: yaml\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("crouch.yaml"), "steps:\n  - [base_auto]\n").unwrap();
        let d = dispatcher_over(dir.path(), Arc::new(FakeHandle::default()));

        assert_eq!(d.list_actions(None).len(), 1);
        assert_eq!(d.send_action("_crouch"), SendStatus::Success);
    }

    #[test]
    fn failed_submission_is_not_retried() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("actions.yaml"),
            "actions:\n  - id: a\n    file: a.yaml\n    type: yaml\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("a.yaml"), "steps:\n  - [base_auto]\n").unwrap();
        let handle = Arc::new(FakeHandle {
            fail_submit: true,
            ..Default::default()
        });
        let d = dispatcher_over(dir.path(), handle.clone());

        assert_eq!(d.send_action("a"), SendStatus::Success);
        d.advance().unwrap();
        assert_eq!(state(&d), Some(ActionState::Error));
        d.advance().unwrap();
        assert_eq!(state(&d), Some(ActionState::Error));
    }

    #[test]
    fn replacing_running_action_cancels_once() {
        let (_dir, handle, d) = fixture();
        d.send_action("valid-action");
        d.advance().unwrap();
        handle.set_status(GoalStatus::Active);

        assert_eq!(d.send_action("other-action"), SendStatus::Success);
        assert_eq!(handle.cancels(), 1);
        assert_eq!(d.active().unwrap().id, "other-action");
        assert_eq!(state(&d), Some(ActionState::Initialized));

        d.advance().unwrap();
        assert_eq!(handle.submits(), 2);
        assert_eq!(handle.cancels(), 1);
    }

    #[test]
    fn failed_send_still_clears_previous_action() {
        let (_dir, handle, d) = fixture();
        d.send_action("valid-action");
        d.advance().unwrap();

        assert_eq!(d.send_action("walk-forward"), SendStatus::NotFound);
        assert!(!d.has_action());
        assert_eq!(handle.cancels(), 1);
        assert!(!handle.has_goal());
    }

    #[test]
    fn reset_is_idempotent() {
        let (_dir, handle, d) = fixture();
        d.reset();
        d.reset();
        assert!(!d.has_action());

        d.send_action("valid-action");
        d.advance().unwrap();
        d.reset();
        d.reset();
        assert!(!d.has_action());
        assert_eq!(handle.cancels(), 1);
        assert!(!handle.has_goal());
    }

    #[test]
    fn preempt_without_goal_is_noop() {
        let (_dir, handle, d) = fixture();
        d.preempt();
        assert_eq!(handle.cancels(), 0);

        d.send_action("valid-action");
        d.preempt();
        assert_eq!(handle.cancels(), 0);
    }

    #[test]
    fn preempt_cancels_active_goal() {
        let (_dir, handle, d) = fixture();
        d.send_action("valid-action");
        d.advance().unwrap();
        handle.set_status(GoalStatus::Active);
        d.preempt();
        assert_eq!(handle.cancels(), 1);
    }

    #[test]
    fn preempt_swallows_status_errors() {
        let handle = Arc::new(FakeHandle {
            fail_status: true,
            ..Default::default()
        });
        *handle.tracked.lock().unwrap() = true;
        let dir = TempDir::new().unwrap();
        let d = dispatcher_over(dir.path(), handle.clone());
        d.preempt();
        assert_eq!(handle.cancels(), 0);
    }

    #[test]
    fn every_listed_action_gets_a_status() {
        let (_dir, _handle, d) = fixture();
        let listed = d.list_actions(None);
        assert_eq!(listed.len(), 5);
        for summary in listed {
            let status = d.send_action(&summary.id);
            assert_ne!(status, SendStatus::Unknown, "{}", summary.id);
        }
    }

    #[test]
    fn list_filters_by_collection() {
        let (_dir, _handle, d) = fixture();
        let ids: Vec<_> = d
            .list_actions(Some("walking"))
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec!["other-action", "valid-action"]);
        assert!(d.list_actions(Some("nope")).is_empty());
        assert_eq!(d.list_actions(Some("")).len(), 5);
        assert_eq!(d.list_collections().len(), 1);
    }

    #[test]
    fn describe_includes_actions_without_files() {
        let (_dir, _handle, d) = fixture();
        let ghost = d.describe("ghost").unwrap();
        assert!(ghost.file.is_none());
        assert_eq!(ghost.group, "basic");
        assert!(matches!(
            d.describe("nope"),
            Err(StepperError::ActionNotFound(_))
        ));
    }

    #[test]
    fn update_picks_up_new_actions() {
        let (dir, _handle, d) = fixture();
        assert_eq!(d.send_action("late"), SendStatus::NotFound);

        let pkg = dir.path().join("extra");
        std::fs::create_dir_all(&pkg).unwrap();
        std::fs::write(
            pkg.join("actions.yaml"),
            "actions:\n  - id: late\n    file: late.yaml\n    type: yaml\n",
        )
        .unwrap();
        std::fs::write(pkg.join("late.yaml"), "steps:\n  - [base_auto]\n").unwrap();

        assert!(d.update());
        assert_eq!(d.send_action("late"), SendStatus::Success);
    }

    struct EmptyBuilder;

    impl ActionBuilder for EmptyBuilder {
        fn build(&self, _descriptor: &ActionDescriptor) -> Result<Option<Box<dyn Action>>> {
            Ok(None)
        }
    }

    #[test]
    fn builder_returning_nothing_is_unknown() {
        let (dir, handle, _d) = fixture();
        let d = Dispatcher::new(
            Catalog::open(vec![dir.path().to_path_buf()]),
            Box::new(EmptyBuilder),
            handle,
        );
        assert_eq!(d.send_action("valid-action"), SendStatus::Unknown);
        assert!(!d.has_action());
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            status_for(&StepperError::ActionNotFound("x".into())),
            SendStatus::NotFound
        );
        assert_eq!(
            status_for(&StepperError::NoScriptRuntime("python3".into())),
            SendStatus::Error
        );
        assert_eq!(
            status_for(&StepperError::InternalContract("x".into())),
            SendStatus::Unknown
        );
    }

    #[test]
    fn concurrent_sends_leave_one_action() {
        let (_dir, handle, d) = fixture();
        let d = Arc::new(d);

        let senders: Vec<_> = (0..4)
            .map(|i| {
                let d = d.clone();
                thread::spawn(move || {
                    for n in 0..20 {
                        let id = if (i + n) % 2 == 0 { "valid-action" } else { "other-action" };
                        assert_eq!(d.send_action(id), SendStatus::Success);
                    }
                })
            })
            .collect();
        let ticker = {
            let d = d.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    d.advance().unwrap();
                }
            })
        };
        for s in senders {
            s.join().unwrap();
        }
        ticker.join().unwrap();

        assert!(d.has_action());
        // Every goal but the current one was canceled and released.
        d.reset();
        assert!(!handle.has_goal());
        assert!(handle.cancels() <= handle.submits());
    }
}
