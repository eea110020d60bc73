//! Interpreter detection and subprocess invocation for script actions.
//!
//! A script action is an executable file that computes its goal at load time.
//! It runs in its own process and writes a single JSON document to stdout:
//!
//! ```json
//! {"action": {"preempt": "preempt_immediate", "steps": [{"step": [{"base_auto": {}}]}]}}
//! ```
//!
//! The `action` member uses the same shape as a declarative definition file.
//!
//! # Environment
//! - `STEPPER_ACTION_ID`:  id the script was resolved from
//! - `STEPPER_ACTION_DIR`: package directory (also the working directory)
//!
//! Stdin is closed and stderr flows through to the host process, so script
//! log lines appear next to the server's own output.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use goal_client::GoalSpec;
use tracing::debug;

use crate::error::{Result, StepperError};
use crate::goal::goal_from_value;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How a script file is launched, chosen from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpreter {
    Python,
    Shell,
    /// Executed as-is; the file must be executable.
    Direct,
}

impl Interpreter {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("py") => Interpreter::Python,
            Some("sh") => Interpreter::Shell,
            _ => Interpreter::Direct,
        }
    }

    /// Program name looked up on `PATH`, if any.
    pub fn program(&self) -> Option<&'static str> {
        match self {
            Interpreter::Python => Some("python3"),
            Interpreter::Shell => Some("sh"),
            Interpreter::Direct => None,
        }
    }

    /// Fails with `NoScriptRuntime` when the interpreter is not installed.
    pub fn detect(&self) -> Result<()> {
        match self.program() {
            Some(program) if which::which(program).is_err() => {
                Err(StepperError::NoScriptRuntime(program.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn command(&self, script: &Path) -> Command {
        match self.program() {
            Some(program) => {
                let mut cmd = Command::new(program);
                cmd.arg(script);
                cmd
            }
            None => Command::new(script),
        }
    }
}

/// Run `script` and return its stdout.
///
/// Spawn failures, a non-zero exit status and running past `timeout` are all
/// reported as `ScriptExecution`.
pub fn run_script(script: &Path, id: &str, package_dir: &Path, timeout: Duration) -> Result<String> {
    let failed = |reason: String| StepperError::ScriptExecution {
        path: script.to_path_buf(),
        reason,
    };

    let interpreter = Interpreter::for_path(script);
    interpreter.detect()?;

    let mut cmd = interpreter.command(script);
    cmd.env("STEPPER_ACTION_ID", id)
        .env("STEPPER_ACTION_DIR", package_dir)
        .current_dir(package_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

    let mut child = cmd.spawn().map_err(|e| failed(e.to_string()))?;

    // Drain stdout on a helper thread so a chatty script cannot fill the
    // pipe and stall while we wait for it.
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| failed("stdout was not captured".to_string()))?;
    let reader = thread::spawn(move || {
        let mut buf = String::new();
        stdout.read_to_string(&mut buf).map(|_| buf)
    });

    let status = wait_with_timeout(&mut child, timeout).map_err(|e| failed(e.to_string()))?;
    let Some(status) = status else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(failed(format!("timed out after {timeout:?}")));
    };

    let output = reader
        .join()
        .map_err(|_| failed("stdout reader panicked".to_string()))?
        .map_err(|e| failed(format!("cannot read stdout: {e}")))?;

    if !status.success() {
        let hint = output.chars().take(500).collect::<String>();
        return Err(failed(format!("exited with {status}: {hint}")));
    }

    debug!(script = %script.display(), bytes = output.len(), "script finished");
    Ok(output)
}

fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
) -> std::io::Result<Option<std::process::ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Extract the goal from a script's stdout.
pub fn parse_script_output(script: &Path, stdout: &str) -> Result<GoalSpec> {
    let doc: serde_json::Value =
        serde_json::from_str(stdout.trim()).map_err(|e| StepperError::ScriptExecution {
            path: script.to_path_buf(),
            reason: format!("stdout is not JSON: {e}"),
        })?;

    let action = match doc.get("action") {
        None | Some(serde_json::Value::Null) => {
            return Err(StepperError::ScriptContract(script.to_path_buf()))
        }
        Some(action) => action,
    };

    let invalid = |reason: String| StepperError::DefinitionInvalid {
        path: script.to_path_buf(),
        reason,
    };
    let value = serde_yaml::to_value(action).map_err(|e| invalid(e.to_string()))?;
    goal_from_value(&value).map_err(invalid)
}

/// Run `script` and parse the goal it prints.
pub fn load_script_goal(
    script: &Path,
    id: &str,
    package_dir: &Path,
    timeout: Duration,
) -> Result<GoalSpec> {
    let stdout = run_script(script, id, package_dir, timeout)?;
    parse_script_output(script, &stdout)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
