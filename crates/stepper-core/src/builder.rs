//! Turning catalog descriptors into runnable actions.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::action::{Action, GoalAction};
use crate::catalog::ActionDescriptor;
use crate::error::{Result, StepperError};
use crate::remote::ExecutionHandle;
use crate::types::ActionFormat;
use crate::{goal, script};

/// Materializes an [`Action`] from a resolved descriptor.
///
/// Returning `Ok(None)` is a contract violation; the dispatcher reports it
/// as `UNKNOWN`.
pub trait ActionBuilder: Send + Sync {
    fn build(&self, descriptor: &ActionDescriptor) -> Result<Option<Box<dyn Action>>>;
}

/// Production builder: reads declarative files or runs scripts, then wraps
/// the resulting goal in a [`GoalAction`] bound to the shared handle.
pub struct DefinitionBuilder {
    handle: Arc<dyn ExecutionHandle>,
    script_timeout: Duration,
}

impl DefinitionBuilder {
    pub fn new(handle: Arc<dyn ExecutionHandle>, script_timeout: Duration) -> Self {
        Self {
            handle,
            script_timeout,
        }
    }

    fn definition<'a>(&self, descriptor: &'a ActionDescriptor) -> Result<&'a Path> {
        descriptor
            .file
            .as_deref()
            .ok_or_else(|| StepperError::DefinitionMissing(descriptor.id.clone()))
    }
}

impl ActionBuilder for DefinitionBuilder {
    fn build(&self, descriptor: &ActionDescriptor) -> Result<Option<Box<dyn Action>>> {
        let path = self.definition(descriptor)?;
        let goal = match descriptor.format {
            ActionFormat::Declarative => {
                info!(action = %descriptor.id, path = %path.display(), "loading action definition");
                goal::load_goal(path)?
            }
            ActionFormat::Script => {
                info!(action = %descriptor.id, path = %path.display(), "loading action script");
                script::load_script_goal(
                    path,
                    &descriptor.id,
                    &descriptor.directory,
                    self.script_timeout,
                )?
            }
        };
        Ok(Some(Box::new(GoalAction::new(goal, self.handle.clone()))))
    }
}
