use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendActionBody {
    pub action_id: String,
}

/// POST /api/send: replace the current action.
///
/// Always answers 200; the outcome is carried in `result_status`. Loading a
/// script action can take up to the script timeout, so the call runs on the
/// blocking pool.
pub async fn send_action(
    State(app): State<AppState>,
    Json(body): Json<SendActionBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let dispatcher = app.dispatcher.clone();
    let status = tokio::task::spawn_blocking(move || dispatcher.send_action(body.action_id.trim()))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))?;

    Ok(Json(serde_json::json!({ "result_status": status })))
}

/// POST /api/reset: stop and drop the current action.
pub async fn reset(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let dispatcher = app.dispatcher.clone();
    tokio::task::spawn_blocking(move || dispatcher.reset())
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))?;

    Ok(Json(serde_json::json!({ "reset": true })))
}

/// GET /api/active: the installed action, if any.
pub async fn active(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let dispatcher = app.dispatcher.clone();
    let active = tokio::task::spawn_blocking(move || dispatcher.active())
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))?;

    Ok(Json(serde_json::json!({ "active": active })))
}
