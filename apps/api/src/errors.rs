use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::engine::AnalysisError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Input unavailable: {0}")]
    InputUnavailable(String),

    #[error("PDF extraction failed: {0}")]
    PdfExtraction(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::InputUnavailable(_) => AppError::InputUnavailable(err.to_string()),
            AnalysisError::InvalidRules(msg) => AppError::Validation(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::InputUnavailable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INPUT_UNAVAILABLE",
                msg.clone(),
            ),
            AppError::PdfExtraction(msg) => {
                tracing::warn!("PDF extraction failed: {msg}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "PDF_EXTRACTION_FAILED",
                    msg.clone(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
