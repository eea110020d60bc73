use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

/// POST /api/update: rescan the catalog from disk.
pub async fn update(State(app): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let dispatcher = app.dispatcher.clone();
    let success = tokio::task::spawn_blocking(move || dispatcher.update())
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))?;

    Ok(Json(serde_json::json!({ "success": success })))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListActionsQuery {
    #[serde(default)]
    collection_id: Option<String>,
}

/// GET /api/actions?collection_id=: actions sorted by id, optionally
/// restricted to one collection.
pub async fn list_actions(
    State(app): State<AppState>,
    Query(query): Query<ListActionsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let dispatcher = app.dispatcher.clone();
    let actions =
        tokio::task::spawn_blocking(move || dispatcher.list_actions(query.collection_id.as_deref()))
            .await
            .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))?;

    Ok(Json(serde_json::json!({ "actions": actions })))
}

/// GET /api/actions/{id}: full descriptor, including the definition path.
pub async fn get_action(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let dispatcher = app.dispatcher.clone();
    let result = tokio::task::spawn_blocking(move || {
        let descriptor = dispatcher.describe(&id)?;
        let json = serde_json::to_value(&descriptor)?;
        Ok::<_, stepper_core::StepperError>(json)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    Ok(Json(result))
}

/// GET /api/collections
pub async fn list_collections(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let dispatcher = app.dispatcher.clone();
    let collections = tokio::task::spawn_blocking(move || dispatcher.list_collections())
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))?;

    Ok(Json(serde_json::json!({ "collections": collections })))
}
