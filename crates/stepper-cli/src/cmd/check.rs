use crate::output::print_json;
use anyhow::Context;
use stepper_core::catalog::Catalog;
use stepper_core::config::{Config, WarnLevel};
use std::path::Path;

/// Validate `.stepper/config.yaml` and scan the catalog it points at.
pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let warnings = config.validate_at(root);

    let mut catalog = Catalog::new(config.catalog_roots(root));
    let catalog_ok = catalog.update();
    let missing: Vec<&str> = catalog
        .list_actions(None)
        .iter()
        .filter_map(|a| catalog.actions().get(&a.id))
        .filter(|d| d.file.is_none())
        .map(|d| d.id.as_str())
        .collect();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
            "catalog_ok": catalog_ok,
            "actions": catalog.actions().len(),
            "collections": catalog.list_collections().len(),
            "missing_files": missing,
        });
        print_json(&value)?;
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
        for id in &missing {
            println!("[warning] action '{id}' has no definition file");
        }
        if !catalog_ok {
            println!("[warning] catalog scanned with errors (run with RUST_LOG=warn for details)");
        }
        println!(
            "{} actions, {} collections",
            catalog.actions().len(),
            catalog.list_collections().len()
        );
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
