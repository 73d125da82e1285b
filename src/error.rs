//! Error types for the translation service

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::server::types::ErrorResponse;

/// Translation-related errors.
///
/// A closed set of variants so callers and tests can tell client-input
/// errors (an unknown language tag) apart from internal failures (a tensor
/// operation going wrong). The load-time variants are only produced while
/// the process is starting and never reach the HTTP layer.
#[derive(Error, Debug)]
pub enum TranslateError {
    /// Language tag absent from the model's vocabulary
    #[error("unknown language code: {code}")]
    UnknownLanguageCode { code: String },

    /// Tokenizer failed to encode or decode
    #[error("tokenizer error: {0}")]
    Tokenize(String),

    /// Tensor or generation failure inside the model
    #[error("generation error: {0}")]
    Generation(#[from] candle_core::Error),

    /// Failure outside the model itself, e.g. a dead worker task
    #[error("internal error: {0}")]
    Internal(String),

    /// Startup-time checkpoint loading failure (fatal)
    #[error("model load error: {0}")]
    ModelLoad(String),
}

/// Result type for translation operations.
pub type Result<T> = std::result::Result<T, TranslateError>;

/// Every request-time failure maps to a generic server error carrying the
/// error's display message as the `detail` field.
impl IntoResponse for TranslateError {
    fn into_response(self) -> Response {
        error!("Translation failed: {}", self);
        let body = ErrorResponse {
            detail: self.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
