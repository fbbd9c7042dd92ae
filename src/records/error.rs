use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::repository::{GeneratorError, RepositoryError};

/// Error raised by the tech record workflows.
#[derive(Debug, thiserror::Error)]
pub enum TechRecordError {
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    AmbiguousMatch(String),
    #[error("{0}")]
    AmbiguousState(String),
    #[error("{0}")]
    State(String),
    #[error("invalid vehicle type: {0}")]
    InvalidVehicleType(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl TechRecordError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(vec![message.into()])
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::State(_) | Self::InvalidVehicleType(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AmbiguousMatch(_) | Self::AmbiguousState(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Repository(RepositoryError::Conflict | RepositoryError::StaleRevision) => {
                StatusCode::CONFLICT
            }
            Self::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            Self::Repository(RepositoryError::Unavailable(_))
            | Self::Generator(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Every message the caller should see; validation reports all failed constraints.
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Validation(messages) => messages.clone(),
            other => vec![other.to_string()],
        }
    }
}

impl IntoResponse for TechRecordError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "errors": self.messages() }));
        (status, body).into_response()
    }
}
