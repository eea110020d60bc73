use anyhow::Context;
use stepper_core::{config::Config, io, paths};
use std::path::Path;

const SAMPLE_PACKAGE: &str = "basics";

const SAMPLE_ACTIONS: &str = "\
actions:
  - id: stand_up
    name: Stand up
    file: stand_up.yaml
    type: yaml
";

const SAMPLE_COLLECTIONS: &str = "\
collections:
  - id: posture
    name: Posture
    actions: [stand_up]
";

const SAMPLE_GOAL: &str = "\
preempt: preempt_immediate
steps:
  - step:
      - base_auto: { height: 0.45 }
";

pub fn run(root: &Path, action_server: &str) -> anyhow::Result<()> {
    println!("Initializing stepper in: {}", root.display());

    let dir = paths::stepper_dir(root);
    io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let config_path = paths::config_path(root);
    if !config_path.exists() {
        Config::new(action_server)
            .save(root)
            .context("failed to write config.yaml")?;
        println!("  created: .stepper/config.yaml");
    } else {
        println!("  exists:  .stepper/config.yaml");
    }

    // Only scaffold the sample package into an empty catalog.
    let catalog = root.join(paths::DEFAULT_CATALOG_DIR);
    let has_packages = std::fs::read_dir(&catalog)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false);
    if has_packages {
        println!("  exists:  {}/", paths::DEFAULT_CATALOG_DIR);
        return Ok(());
    }

    let package = catalog.join(SAMPLE_PACKAGE);
    let files = [
        (paths::actions_file(&package), SAMPLE_ACTIONS),
        (paths::collections_file(&package), SAMPLE_COLLECTIONS),
        (package.join("stand_up.yaml"), SAMPLE_GOAL),
    ];
    for (path, content) in files {
        if io::write_if_missing(&path, content.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?
        {
            let shown = path.strip_prefix(root).unwrap_or(&path);
            println!("  created: {}", shown.display());
        }
    }
    Ok(())
}
