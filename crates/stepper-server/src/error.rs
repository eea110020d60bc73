use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use stepper_core::error::StepperError;

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if let Some(e) = self.0.downcast_ref::<StepperError>() {
            match e {
                StepperError::NotInitialized | StepperError::InvalidActionId(_) => {
                    StatusCode::BAD_REQUEST
                }
                StepperError::ActionNotFound(_) | StepperError::DefinitionMissing(_) => {
                    StatusCode::NOT_FOUND
                }
                StepperError::DefinitionInvalid { .. }
                | StepperError::ScriptContract(_)
                | StepperError::NotRunnable { .. }
                | StepperError::NotStartable(_) => StatusCode::UNPROCESSABLE_ENTITY,
                StepperError::NoScriptRuntime(_) => StatusCode::SERVICE_UNAVAILABLE,
                StepperError::Remote(_) => StatusCode::BAD_GATEWAY,
                StepperError::ScriptExecution { .. }
                | StepperError::InternalContract(_)
                | StepperError::SlotPoisoned
                | StepperError::Io(_)
                | StepperError::Yaml(_)
                | StepperError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
