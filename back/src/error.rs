use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use tareas_api::v1::ValidationError;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("task not found: {0}")]
    NotFound(Uuid),
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for TaskError {
    fn into_response(self) -> Response {
        let status = match &self {
            TaskError::Validation(_) => StatusCode::BAD_REQUEST,
            TaskError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        let body = ErrorBody {
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
