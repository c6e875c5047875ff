use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use super::client::MailChimpError;
use super::validation::FieldErrors;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{resource}[{key}] not found")]
    NotFound { resource: &'static str, key: String },
    #[error("Invalid data given")]
    ValidationFailed { errors: FieldErrors },
    /// Raised after the local write already committed
    #[error("{message}")]
    RemoteCallFailed { message: String },
    #[error("{0}")]
    MalformedBody(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl SyncError {
    pub fn not_found(resource: &'static str, key: impl Into<String>) -> Self {
        SyncError::NotFound {
            resource,
            key: key.into(),
        }
    }

    pub fn remote(message: impl Into<String>) -> Self {
        SyncError::RemoteCallFailed {
            message: message.into(),
        }
    }
}

impl From<FieldErrors> for SyncError {
    fn from(errors: FieldErrors) -> Self {
        SyncError::ValidationFailed { errors }
    }
}

impl From<MailChimpError> for SyncError {
    fn from(error: MailChimpError) -> Self {
        SyncError::remote(error.to_string())
    }
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            SyncError::NotFound { .. } => {
                (StatusCode::NOT_FOUND, json!({ "message": self.to_string() }))
            }
            SyncError::ValidationFailed { errors } => (
                StatusCode::BAD_REQUEST,
                json!({ "message": self.to_string(), "errors": errors }),
            ),
            SyncError::RemoteCallFailed { .. } | SyncError::MalformedBody(_) => {
                (StatusCode::BAD_REQUEST, json!({ "message": self.to_string() }))
            }
            SyncError::Database(e) => {
                log::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Database error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
