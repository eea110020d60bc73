//! Blocking client for a running `stepper serve` instance.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context};
use stepper_core::config::Config;

/// Control requests can wait on a script load, so allow more than the
/// usual request timeout.
const TIMEOUT: Duration = Duration::from_secs(60);

pub struct ApiClient {
    base: String,
}

impl ApiClient {
    /// Use `explicit` when given, otherwise the port from the project config.
    pub fn resolve(root: &Path, explicit: Option<&str>) -> anyhow::Result<Self> {
        let base = match explicit {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => {
                let config = Config::load(root).context("failed to load config")?;
                format!("http://localhost:{}", config.server.port)
            }
        };
        Ok(Self { base })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn get(&self, path: &str) -> anyhow::Result<serde_json::Value> {
        let response = ureq::get(&self.url(path)).timeout(TIMEOUT).call();
        self.read(path, response)
    }

    pub fn post(&self, path: &str, body: &serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let response = ureq::post(&self.url(path))
            .timeout(TIMEOUT)
            .set("Content-Type", "application/json")
            .send_string(&body.to_string());
        self.read(path, response)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn read(
        &self,
        path: &str,
        response: Result<ureq::Response, ureq::Error>,
    ) -> anyhow::Result<serde_json::Value> {
        let response = match response {
            Ok(r) => r,
            Err(ureq::Error::Status(code, r)) => {
                let body = r.into_string().unwrap_or_default();
                let message = serde_json::from_str::<serde_json::Value>(&body)
                    .ok()
                    .and_then(|v| v["error"].as_str().map(str::to_string))
                    .unwrap_or(body);
                return Err(anyhow!("{path} returned {code}: {message}"));
            }
            Err(e) => {
                return Err(anyhow!(e).context(format!(
                    "cannot reach stepper server at {} (is `stepper serve` running?)",
                    self.base
                )))
            }
        };
        let text = response
            .into_string()
            .with_context(|| format!("failed to read response from {path}"))?;
        serde_json::from_str(&text).with_context(|| format!("invalid JSON from {path}"))
    }
}
