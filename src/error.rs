use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Message shown when the requester's resonance circle yields nothing
pub const NOTHING_TO_RECOMMEND: &str = "No recommendation found in your resonance circle";

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("No resonant users found")]
    NoResonanceFound,

    #[error("No candidate spot scored above zero")]
    NoViableCandidate,

    #[error("Distillation cancelled during {0}")]
    Cancelled(&'static str),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for failures raised by a storage collaborator
    pub fn is_storage(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Storage(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidCoordinate(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NoResonanceFound | AppError::NoViableCandidate => {
                (StatusCode::NOT_FOUND, NOTHING_TO_RECOMMEND.to_string())
            }
            AppError::Cancelled(_) => (StatusCode::GATEWAY_TIMEOUT, self.to_string()),
            AppError::Database(ref e) => {
                tracing::error!(error = %e, "Database failure while serving request");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Storage(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
