//! Error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use risk_core::{InferenceError, PipelineError, PredictionOutcome};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Auth errors
    #[error("token has expired")]
    TokenExpired,
    #[error("invalid token")]
    TokenInvalid,
    #[error("authentication required")]
    Unauthorized,

    // Request errors
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    ExtractionFailed(String),
    #[error("{0}")]
    ValidationError(String),

    // Model errors
    #[error("model not loaded")]
    ModelUnavailable,
    #[error("{0}")]
    InferenceError(String),

    /// The prediction was made but could not be saved
    #[error("prediction not saved: {reason}")]
    NotSaved {
        outcome: Box<PredictionOutcome>,
        reason: String,
    },

    // Database errors
    #[error("{0}")]
    DatabaseError(String),

    // Generic errors
    #[error("{0}")]
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token has expired".to_string()),
            AppError::TokenInvalid => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication required".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::ExtractionFailed(msg) => {
                tracing::warn!("Extraction failed: {}", msg);
                (StatusCode::BAD_REQUEST, format!("Could not extract data from document: {}", msg))
            }
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::ModelUnavailable => {
                tracing::error!("Prediction requested but no model is loaded");
                (StatusCode::SERVICE_UNAVAILABLE, "Model not loaded".to_string())
            }
            AppError::InferenceError(msg) => {
                tracing::error!("Inference error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Inference failed".to_string())
            }
            AppError::NotSaved { reason, .. } => {
                tracing::error!("Prediction not saved: {}", reason);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Prediction computed but could not be saved".to_string(),
                )
            }
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred".to_string())
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let mut body = json!({
            "error": error_message,
            "status": status.as_u16()
        });
        if let AppError::NotSaved { outcome, .. } = &self {
            body["prediction"] = json!(outcome);
        }

        (status, Json(body)).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Extraction(e) => match e {
                risk_core::ExtractionError::Worker(msg) => AppError::InternalError(msg),
                other => AppError::ExtractionFailed(other.to_string()),
            },
            PipelineError::Validation(e) => AppError::ValidationError(e.to_string()),
            PipelineError::Inference(InferenceError::ModelNotLoaded) => AppError::ModelUnavailable,
            PipelineError::Inference(e) => AppError::InferenceError(e.to_string()),
            PipelineError::Persistence { outcome, source } => AppError::NotSaved {
                outcome,
                reason: source.to_string(),
            },
            PipelineError::Retrieval(e) => AppError::DatabaseError(e.to_string()),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::TokenInvalid,
        }
    }
}
