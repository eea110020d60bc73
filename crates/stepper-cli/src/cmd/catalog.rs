use crate::output::{print_json, print_table};
use anyhow::Context;
use stepper_core::catalog::Catalog;
use stepper_core::config::Config;
use std::path::Path;

fn open(root: &Path) -> anyhow::Result<Catalog> {
    let config = Config::load(root).context("failed to load config")?;
    Ok(Catalog::open(config.catalog_roots(root)))
}

pub fn list_actions(root: &Path, collection: Option<&str>, json: bool) -> anyhow::Result<()> {
    let catalog = open(root)?;
    let actions = catalog.list_actions(collection.filter(|c| !c.is_empty()));

    if json {
        return print_json(&actions);
    }
    if actions.is_empty() {
        println!("No actions.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = actions
        .iter()
        .map(|a| {
            vec![
                a.id.clone(),
                a.name.clone(),
                a.group.clone(),
                a.format.to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "GROUP", "FORMAT"], &rows);
    Ok(())
}

pub fn list_collections(root: &Path, json: bool) -> anyhow::Result<()> {
    let catalog = open(root)?;
    let collections = catalog.list_collections();

    if json {
        return print_json(&collections);
    }
    if collections.is_empty() {
        println!("No collections.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = collections
        .iter()
        .map(|c| vec![c.id.clone(), c.name.clone(), c.action_ids.join(", ")])
        .collect();
    print_table(&["ID", "NAME", "ACTIONS"], &rows);
    Ok(())
}

pub fn show(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let catalog = open(root)?;
    let descriptor = catalog
        .actions()
        .get(id)
        .with_context(|| format!("action not found: {id}"))?;

    if json {
        return print_json(descriptor);
    }
    println!("id:        {}", descriptor.id);
    println!("name:      {}", descriptor.name);
    println!("group:     {}", descriptor.group);
    println!("format:    {}", descriptor.format);
    println!("directory: {}", descriptor.directory.display());
    match &descriptor.file {
        Some(file) => println!("file:      {}", file.display()),
        None => println!("file:      (missing)"),
    }
    Ok(())
}
