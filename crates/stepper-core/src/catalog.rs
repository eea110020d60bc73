//! On-disk action catalog.
//!
//! Each catalog root is scanned one level deep for *packages*: directories
//! holding an `actions.yaml` and/or a `collections.yaml`. A root that is itself
//! a package is included as well. The package directory name is the group id
//! of every action it declares.
//!
//! ```yaml
//! # actions.yaml
//! actions:
//!   - id: walk_forward
//!     name: Walk forward
//!     file: actions/walk_forward.yaml
//!     type: yaml
//! ```
//!
//! ```yaml
//! # collections.yaml
//! collections:
//!   - id: locomotion
//!     name: Locomotion
//!     actions: [walk_forward, turn_left]
//! ```

use crate::error::{Result, StepperError};
use crate::paths;
use crate::types::{ActionFormat, ActionSummary, CollectionSummary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// ActionDescriptor
// ---------------------------------------------------------------------------

/// Everything needed to load one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub id: String,
    pub name: String,
    pub format: ActionFormat,
    /// Definition file; `None` when the declared file does not exist.
    pub file: Option<PathBuf>,
    /// Package directory the action was declared in.
    pub directory: PathBuf,
    /// Owning group (package) id.
    pub group: String,
}

impl ActionDescriptor {
    pub fn summary(&self) -> ActionSummary {
        ActionSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            group: self.group.clone(),
            format: self.format,
        }
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub action_ids: Vec<String>,
}

impl Collection {
    pub fn summary(&self) -> CollectionSummary {
        CollectionSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            action_ids: self.action_ids.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// File formats
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ActionsFile {
    #[serde(default)]
    actions: Vec<ActionEntry>,
}

#[derive(Debug, Deserialize)]
struct ActionEntry {
    id: String,
    #[serde(default)]
    name: Option<String>,
    file: PathBuf,
    #[serde(rename = "type")]
    format: ActionFormat,
}

#[derive(Debug, Deserialize)]
struct CollectionsFile {
    #[serde(default)]
    collections: Vec<CollectionEntry>,
}

#[derive(Debug, Deserialize)]
struct CollectionEntry {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    actions: Vec<String>,
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&data)?)
}

/// Find every package under `roots`, in a stable order.
pub fn discover_packages(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut packages = Vec::new();
    for root in roots {
        if !root.is_dir() {
            warn!(path = %root.display(), "catalog path does not exist");
            continue;
        }
        if paths::is_package(root) {
            packages.push(root.clone());
        }
        let mut children: Vec<PathBuf> = match std::fs::read_dir(root) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir() && paths::is_package(p))
                .collect(),
            Err(e) => {
                warn!(path = %root.display(), error = %e, "cannot read catalog path");
                continue;
            }
        };
        children.sort();
        packages.extend(children);
    }
    packages
}

fn group_id(package: &Path) -> String {
    package
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| package.display().to_string())
}

// ---------------------------------------------------------------------------
// ActionList
// ---------------------------------------------------------------------------

/// All actions declared under the catalog roots, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ActionList {
    roots: Vec<PathBuf>,
    actions: BTreeMap<String, ActionDescriptor>,
}

impl ActionList {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            actions: BTreeMap::new(),
        }
    }

    /// Rescan the catalog. Returns `false` if any package could not be read
    /// or declared an invalid or duplicate id; everything valid is still
    /// loaded.
    pub fn update(&mut self) -> bool {
        let mut ok = true;
        let mut actions = BTreeMap::new();

        for package in discover_packages(&self.roots) {
            let file = paths::actions_file(&package);
            if !file.is_file() {
                continue;
            }
            let parsed: ActionsFile = match read_yaml(&file) {
                Ok(p) => p,
                Err(e) => {
                    warn!(path = %file.display(), error = %e, "cannot load action list");
                    ok = false;
                    continue;
                }
            };
            let group = group_id(&package);
            for entry in parsed.actions {
                if let Err(e) = paths::validate_action_id(&entry.id) {
                    warn!(path = %file.display(), error = %e, "skipping action");
                    ok = false;
                    continue;
                }
                if actions.contains_key(&entry.id) {
                    warn!(
                        path = %file.display(),
                        id = %entry.id,
                        "duplicate action id, keeping the first declaration"
                    );
                    ok = false;
                    continue;
                }
                let path = package.join(&entry.file);
                let definition = if path.is_file() {
                    Some(path)
                } else {
                    warn!(id = %entry.id, path = %path.display(), "action file does not exist");
                    None
                };
                let descriptor = ActionDescriptor {
                    name: entry.name.unwrap_or_else(|| entry.id.clone()),
                    id: entry.id,
                    format: entry.format,
                    file: definition,
                    directory: package.clone(),
                    group: group.clone(),
                };
                actions.insert(descriptor.id.clone(), descriptor);
            }
        }

        debug!(count = actions.len(), "action list updated");
        self.actions = actions;
        ok
    }

    pub fn get(&self, id: &str) -> Option<&ActionDescriptor> {
        self.actions.get(id)
    }

    /// Summaries sorted by id, optionally restricted to `ids`.
    pub fn summaries(&self, ids: Option<&[String]>) -> Vec<ActionSummary> {
        match ids {
            None => self.actions.values().map(|d| d.summary()).collect(),
            Some(ids) => self
                .actions
                .values()
                .filter(|d| ids.contains(&d.id))
                .map(|d| d.summary())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// CollectionList
// ---------------------------------------------------------------------------

/// All collections declared under the catalog roots. Collections that share
/// an id across packages are merged.
#[derive(Debug, Clone, Default)]
pub struct CollectionList {
    roots: Vec<PathBuf>,
    collections: BTreeMap<String, Collection>,
}

impl CollectionList {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            collections: BTreeMap::new(),
        }
    }

    pub fn update(&mut self) -> bool {
        let mut ok = true;
        let mut collections: BTreeMap<String, Collection> = BTreeMap::new();

        for package in discover_packages(&self.roots) {
            let file = paths::collections_file(&package);
            if !file.is_file() {
                continue;
            }
            let parsed: CollectionsFile = match read_yaml(&file) {
                Ok(p) => p,
                Err(e) => {
                    warn!(path = %file.display(), error = %e, "cannot load collection list");
                    ok = false;
                    continue;
                }
            };
            for entry in parsed.collections {
                if entry.id.trim().is_empty() {
                    warn!(path = %file.display(), "skipping collection without id");
                    ok = false;
                    continue;
                }
                let collection = collections
                    .entry(entry.id.clone())
                    .or_insert_with(|| Collection {
                        id: entry.id.clone(),
                        name: entry.name.clone().unwrap_or_else(|| entry.id.clone()),
                        action_ids: Vec::new(),
                    });
                for id in entry.actions {
                    if !collection.action_ids.contains(&id) {
                        collection.action_ids.push(id);
                    }
                }
            }
        }

        debug!(count = collections.len(), "collection list updated");
        self.collections = collections;
        ok
    }

    pub fn get(&self, id: &str) -> Option<&Collection> {
        self.collections.get(id)
    }

    pub fn summaries(&self) -> Vec<CollectionSummary> {
        self.collections.values().map(|c| c.summary()).collect()
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Actions plus the collections that group them.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    actions: ActionList,
    collections: CollectionList,
}

impl Catalog {
    /// An empty catalog over `roots`; call [`Catalog::update`] to scan.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            actions: ActionList::new(roots.clone()),
            collections: CollectionList::new(roots),
        }
    }

    /// Build and scan in one go. Scan problems are logged, not fatal.
    pub fn open(roots: Vec<PathBuf>) -> Self {
        let mut catalog = Self::new(roots);
        if !catalog.update() {
            warn!("catalog loaded with errors");
        }
        catalog
    }

    /// Refresh both lists. Both are always rescanned.
    pub fn update(&mut self) -> bool {
        let actions_ok = self.actions.update();
        let collections_ok = self.collections.update();
        actions_ok && collections_ok
    }

    /// Resolve `id` to a descriptor whose definition file exists.
    pub fn resolve(&self, id: &str) -> Result<&ActionDescriptor> {
        let descriptor = self
            .actions
            .get(id)
            .ok_or_else(|| StepperError::ActionNotFound(id.to_string()))?;
        if descriptor.file.is_none() {
            return Err(StepperError::DefinitionMissing(id.to_string()));
        }
        Ok(descriptor)
    }

    /// Action summaries, restricted to one collection when `collection_id` is
    /// given. An unknown collection yields an empty list.
    pub fn list_actions(&self, collection_id: Option<&str>) -> Vec<ActionSummary> {
        match collection_id {
            None => self.actions.summaries(None),
            Some(cid) => match self.collections.get(cid) {
                Some(c) => self.actions.summaries(Some(&c.action_ids)),
                None => Vec::new(),
            },
        }
    }

    pub fn list_collections(&self) -> Vec<CollectionSummary> {
        self.collections.summaries()
    }

    pub fn actions(&self) -> &ActionList {
        &self.actions
    }

    pub fn collections(&self) -> &CollectionList {
        &self.collections
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
