use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::extraction::job_extractor::ExtractionParseError;
use crate::llm_client::LlmError;
use crate::portfolio::dataset::SchemaError;
use crate::portfolio::PortfolioError;
use crate::scrape::FetchError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Retrieval degradation has no variant here: an unreachable index yields
/// an empty link set, never an error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    ExtractionParse(#[from] ExtractionParseError),

    #[error("Model error: {0}")]
    Model(#[from] LlmError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<PortfolioError> for AppError {
    fn from(err: PortfolioError) -> Self {
        match err {
            PortfolioError::Schema(e) => AppError::Schema(e),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Fetch(e) => {
                tracing::warn!("Page fetch failed: {e}");
                (StatusCode::BAD_GATEWAY, "FETCH_ERROR", e.to_string())
            }
            AppError::Schema(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "SCHEMA_ERROR",
                e.to_string(),
            ),
            AppError::ExtractionParse(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "EXTRACTION_PARSE_ERROR",
                e.to_string(),
            ),
            AppError::Model(e) => {
                tracing::error!("LLM error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "MODEL_ERROR",
                    "The language model call failed".to_string(),
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
