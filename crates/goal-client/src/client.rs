use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};
use tracing::debug;
use uuid::Uuid;

use crate::types::{GoalSpec, GoalStatus, StatusResponse, SubmitRequest};
use crate::{GoalClientError, Result};

// ─── GoalClient ───────────────────────────────────────────────────────────

/// Blocking client for the remote execution service.
///
/// Like a simple action client, it tracks at most one goal: the last one
/// submitted. Status queries and `stop_tracking` refer to that goal, while
/// `cancel_all` asks the service to cancel everything it is running.
///
/// All calls are bounded by the request timeout passed to [`GoalClient::new`].
pub struct GoalClient {
    base: Url,
    http: Client,
    tracked: Mutex<Option<String>>,
}

impl GoalClient {
    /// Build a client for `server` (e.g. `http://localhost:8090`).
    pub fn new(server: &str, timeout: Duration) -> Result<Self> {
        let base = parse_base(server)?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(GoalClient {
            base,
            http,
            tracked: Mutex::new(None),
        })
    }

    /// Submit `goal` under a fresh goal id and start tracking it.
    pub fn submit(&self, goal: &GoalSpec) -> Result<String> {
        let goal_id = Uuid::new_v4().to_string();
        let url = self.endpoint("goals")?;
        let body = SubmitRequest {
            goal_id: &goal_id,
            goal,
        };
        let response = self.http.post(url).json(&body).send()?;
        check(response)?;
        debug!(goal_id = %goal_id, steps = goal.steps.len(), "goal submitted");
        *self.lock() = Some(goal_id.clone());
        Ok(goal_id)
    }

    /// Id of the goal currently tracked, if any.
    pub fn tracked_goal(&self) -> Option<String> {
        self.lock().clone()
    }

    pub fn is_tracking(&self) -> bool {
        self.lock().is_some()
    }

    /// Query the status of the tracked goal.
    ///
    /// A goal the service answers 404 for is reported as [`GoalStatus::Lost`].
    pub fn status(&self) -> Result<GoalStatus> {
        let goal_id = self.tracked_goal().ok_or(GoalClientError::NoGoalTracked)?;
        let url = self.endpoint(&format!("goals/{goal_id}"))?;
        let response = self.http.get(url).send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(GoalStatus::Lost);
        }
        let parsed: StatusResponse = check(response)?.json()?;
        Ok(parsed.status)
    }

    /// Ask the service to cancel every pending or active goal.
    pub fn cancel_all(&self) -> Result<()> {
        let url = self.endpoint("goals/cancel")?;
        let response = self.http.post(url).send()?;
        check(response)?;
        debug!("cancel requested for all goals");
        Ok(())
    }

    /// Forget the tracked goal without contacting the service.
    pub fn stop_tracking(&self) {
        self.lock().take();
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base.join(path).map_err(|e| GoalClientError::Url {
            address: self.base.to_string(),
            reason: e.to_string(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<String>> {
        // The guarded value is a plain id; a panic elsewhere cannot leave it torn.
        self.tracked.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ─── Internal ─────────────────────────────────────────────────────────────

/// Parse `server` and make sure relative joins land under its path.
fn parse_base(server: &str) -> Result<Url> {
    let trimmed = server.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash).map_err(|e| GoalClientError::Url {
        address: server.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(GoalClientError::Url {
            address: server.to_string(),
            reason: "expected an http(s) address".into(),
        });
    }
    Ok(url)
}

fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .unwrap_or_default()
        .chars()
        .take(500)
        .collect();
    Err(GoalClientError::Status {
        status: status.as_u16(),
        body,
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Motion, Step};
    use mockito::Matcher;

    fn client(server: &mockito::Server) -> GoalClient {
        GoalClient::new(&server.url(), Duration::from_secs(2)).unwrap()
    }

    fn goal() -> GoalSpec {
        GoalSpec {
            steps: vec![Step {
                motions: vec![Motion {
                    kind: "base_auto".into(),
                    params: serde_json::json!({}),
                }],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn submit_tracks_goal() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/goals")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "goal": { "preempt": "preempt_immediate" }
            })))
            .with_status(202)
            .create();

        let c = client(&server);
        assert!(!c.is_tracking());
        let id = c.submit(&goal()).unwrap();
        mock.assert();
        assert_eq!(c.tracked_goal().as_deref(), Some(id.as_str()));
    }

    #[test]
    fn submit_failure_does_not_track() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/goals")
            .with_status(503)
            .with_body("busy")
            .create();

        let c = client(&server);
        let err = c.submit(&goal()).unwrap_err();
        assert!(matches!(err, GoalClientError::Status { status: 503, .. }));
        assert!(!c.is_tracking());
    }

    #[test]
    fn status_without_goal_is_an_error() {
        let server = mockito::Server::new();
        let c = client(&server);
        assert!(matches!(c.status(), Err(GoalClientError::NoGoalTracked)));
    }

    #[test]
    fn status_reads_tracked_goal() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("POST", "/goals").with_status(202).create();
        let c = client(&server);
        let id = c.submit(&goal()).unwrap();

        let _mock = server
            .mock("GET", format!("/goals/{id}").as_str())
            .with_status(200)
            .with_body(format!(r#"{{"goal_id":"{id}","status":"active"}}"#))
            .create();
        assert_eq!(c.status().unwrap(), GoalStatus::Active);
    }

    #[test]
    fn unknown_goal_is_lost() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("POST", "/goals").with_status(202).create();
        let c = client(&server);
        let id = c.submit(&goal()).unwrap();

        let _mock = server
            .mock("GET", format!("/goals/{id}").as_str())
            .with_status(404)
            .create();
        assert_eq!(c.status().unwrap(), GoalStatus::Lost);
    }

    #[test]
    fn cancel_all_posts_to_service() {
        let mut server = mockito::Server::new();
        let mock = server.mock("POST", "/goals/cancel").with_status(200).create();
        client(&server).cancel_all().unwrap();
        mock.assert();
    }

    #[test]
    fn stop_tracking_forgets_goal() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("POST", "/goals").with_status(202).create();
        let c = client(&server);
        c.submit(&goal()).unwrap();
        c.stop_tracking();
        assert!(!c.is_tracking());
    }

    #[test]
    fn base_path_is_preserved() {
        let c = GoalClient::new("http://robot:8090/api", Duration::from_secs(1)).unwrap();
        assert_eq!(c.endpoint("goals").unwrap().as_str(), "http://robot:8090/api/goals");
    }

    #[test]
    fn rejects_non_http_address() {
        assert!(matches!(
            GoalClient::new("ftp://robot", Duration::from_secs(1)),
            Err(GoalClientError::Url { .. })
        ));
        assert!(GoalClient::new("not an address", Duration::from_secs(1)).is_err());
    }
}
