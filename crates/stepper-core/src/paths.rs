use crate::error::{Result, StepperError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const STEPPER_DIR: &str = ".stepper";
pub const CONFIG_FILE: &str = ".stepper/config.yaml";

/// Default catalog directory, relative to the project root.
pub const DEFAULT_CATALOG_DIR: &str = "actions";

/// Per-package catalog files.
pub const ACTIONS_FILE: &str = "actions.yaml";
pub const COLLECTIONS_FILE: &str = "collections.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn stepper_dir(root: &Path) -> PathBuf {
    root.join(STEPPER_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn actions_file(package: &Path) -> PathBuf {
    package.join(ACTIONS_FILE)
}

pub fn collections_file(package: &Path) -> PathBuf {
    package.join(COLLECTIONS_FILE)
}

/// A directory is a catalog package when it declares actions or collections.
pub fn is_package(dir: &Path) -> bool {
    actions_file(dir).is_file() || collections_file(dir).is_file()
}

// ---------------------------------------------------------------------------
// Action id validation
// ---------------------------------------------------------------------------

static ID_RE: OnceLock<Regex> = OnceLock::new();

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").unwrap())
}

/// Non-empty, `[A-Za-z0-9_.-]` only. The bare `.` and `..` are rejected.
pub fn validate_action_id(id: &str) -> Result<()> {
    if !id_re().is_match(id) || id == "." || id == ".." {
        return Err(StepperError::InvalidActionId(id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
