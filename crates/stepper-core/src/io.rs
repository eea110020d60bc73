//! Writes for project files under `.stepper/` and the catalog.

use crate::error::Result;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Replace `path` with `data` through a tempfile in the same directory, so a
/// reader never sees a half-written config or catalog file.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Serialize `value` as YAML and write it atomically.
pub fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_yaml::to_string(value)?;
    atomic_write(path, text.as_bytes())
}

/// Scaffold `path` with `data` unless something is already there. Returns
/// whether the file was written.
pub fn write_if_missing(path: &Path, data: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    atomic_write(path, data).map(|()| true)
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    Ok(std::fs::create_dir_all(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn nested_package_files_get_their_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("actions/gaits/actions.yaml");
        atomic_write(&path, b"actions: []").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "actions: []");
    }

    #[test]
    fn yaml_is_readable_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ids.yaml");
        write_yaml(&path, &vec!["walk", "trot"]).unwrap();
        let back: Vec<String> =
            serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, vec!["walk", "trot"]);
    }

    #[test]
    fn scaffolding_never_clobbers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stand_up.yaml");
        std::fs::write(&path, "steps: [[sit]]\n").unwrap();
        assert!(!write_if_missing(&path, b"steps: []\n").unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "steps: [[sit]]\n");

        let fresh = dir.path().join("lie_down.yaml");
        assert!(write_if_missing(&fresh, b"steps: []\n").unwrap());
        assert!(fresh.is_file());
    }
}
