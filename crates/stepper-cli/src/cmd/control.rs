use crate::api::ApiClient;
use crate::output::print_json;
use std::path::Path;

// ---------------------------------------------------------------------------
// send
// ---------------------------------------------------------------------------

pub fn send(root: &Path, server: Option<&str>, id: &str, json: bool) -> anyhow::Result<()> {
    let api = ApiClient::resolve(root, server)?;
    let response = api.post("/api/send", &serde_json::json!({ "action_id": id }))?;
    let status = response["result_status"].as_str().unwrap_or("UNKNOWN");

    if json {
        print_json(&response)?;
    } else {
        println!("{id}: {status}");
    }
    if status != "SUCCESS" {
        anyhow::bail!("action '{id}' was not accepted ({status})");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// reset / status / update
// ---------------------------------------------------------------------------

pub fn reset(root: &Path, server: Option<&str>, json: bool) -> anyhow::Result<()> {
    let api = ApiClient::resolve(root, server)?;
    let response = api.post("/api/reset", &serde_json::json!({}))?;
    if json {
        print_json(&response)?;
    } else {
        println!("Reset.");
    }
    Ok(())
}

pub fn status(root: &Path, server: Option<&str>, json: bool) -> anyhow::Result<()> {
    let api = ApiClient::resolve(root, server)?;
    let response = api.get("/api/active")?;
    if json {
        return print_json(&response);
    }
    let active = &response["active"];
    if active.is_null() {
        println!("No action installed ({}).", api.base());
        return Ok(());
    }
    println!(
        "{}: {}",
        active["id"].as_str().unwrap_or("?"),
        active["state"].as_str().unwrap_or("?")
    );
    if let Some(started) = active["started_at"].as_str() {
        println!("started at {started}");
    }
    Ok(())
}

pub fn update(root: &Path, server: Option<&str>, json: bool) -> anyhow::Result<()> {
    let api = ApiClient::resolve(root, server)?;
    let response = api.post("/api/update", &serde_json::json!({}))?;
    if json {
        print_json(&response)?;
    } else if response["success"].as_bool() == Some(true) {
        println!("Catalog updated.");
    } else {
        println!("Catalog updated with errors; see the server log.");
    }
    Ok(())
}
