use crate::error::{Result, StepperError};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    3150
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Address of the remote execution service that accepts goals.
    pub action_server: String,
    /// Directories scanned for action packages, relative to the project root.
    #[serde(default = "default_catalog_paths")]
    pub catalog_paths: Vec<PathBuf>,
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_script_timeout")]
    pub script_timeout_secs: u64,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_version() -> u32 {
    1
}

fn default_catalog_paths() -> Vec<PathBuf> {
    vec![PathBuf::from(paths::DEFAULT_CATALOG_DIR)]
}

fn default_tick_hz() -> u32 {
    10
}

fn default_request_timeout() -> u64 {
    5
}

fn default_script_timeout() -> u64 {
    30
}

impl Config {
    pub fn new(action_server: impl Into<String>) -> Self {
        Self {
            version: default_version(),
            action_server: action_server.into(),
            catalog_paths: default_catalog_paths(),
            tick_hz: default_tick_hz(),
            request_timeout_secs: default_request_timeout(),
            script_timeout_secs: default_script_timeout(),
            server: ServerConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(StepperError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        crate::io::write_yaml(&paths::config_path(root), self)
    }

    /// Catalog directories resolved against `root`.
    pub fn catalog_roots(&self, root: &Path) -> Vec<PathBuf> {
        self.catalog_paths
            .iter()
            .map(|p| if p.is_absolute() { p.clone() } else { root.join(p) })
            .collect()
    }

    /// Period of the driving loop. A zero rate falls back to the default.
    pub fn tick_period(&self) -> Duration {
        let hz = if self.tick_hz == 0 {
            default_tick_hz()
        } else {
            self.tick_hz
        };
        Duration::from_nanos(1_000_000_000 / u64::from(hz))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.script_timeout_secs.max(1))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        let server = self.action_server.trim();
        if server.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "action_server is empty".to_string(),
            });
        } else if !(server.starts_with("http://") || server.starts_with("https://")) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("action_server '{server}' is not an http(s) address"),
            });
        }

        if self.tick_hz == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "tick_hz must be positive (the loop falls back to {} Hz)",
                    default_tick_hz()
                ),
            });
        } else if self.tick_hz > 1000 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("tick_hz={} (>1000 is unusual)", self.tick_hz),
            });
        }

        if self.catalog_paths.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "catalog_paths is empty: no actions will be found".to_string(),
            });
        }

        if self.request_timeout_secs == 0 || self.script_timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "timeouts of 0 seconds are raised to 1 second".to_string(),
            });
        }

        warnings
    }

    /// [`validate`](Self::validate) plus checks against the project tree at
    /// `root`: every catalog path must be an existing directory.
    pub fn validate_at(&self, root: &Path) -> Vec<ConfigWarning> {
        let mut warnings = self.validate();
        for dir in self.catalog_roots(root) {
            if !dir.is_dir() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("catalog path '{}' does not exist", dir.display()),
                });
            }
        }
        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
