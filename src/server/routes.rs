use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, Json};
use tracing::info;

use super::types::{TranslateRequest, TranslateResponse};
use crate::error::TranslateError;
use crate::lang;
use crate::nllb::TranslationEngine;

/// Returns a health check response
pub async fn health_check() -> &'static str {
    info!("Health check endpoint called");
    "nllb-serve is running!"
}

/// Returns the static name-to-code language table.
pub async fn list_languages() -> Json<&'static BTreeMap<&'static str, &'static str>> {
    info!("Languages endpoint called");
    Json(lang::table())
}

/// Handles the translate endpoint.
///
/// Resolves the request's language identifiers through the static table
/// (pass-through for values already in code form), then runs the blocking
/// encode/generate/decode pipeline on the blocking thread pool so the
/// accept loop keeps serving while generation runs.
pub async fn translate(
    State(engine): State<Arc<TranslationEngine>>,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, TranslateError> {
    let src_code = lang::resolve(&request.src_lang);
    let tgt_code = lang::resolve(&request.tgt_lang);
    info!(
        "Translate endpoint called: {} -> {}, {} chars",
        src_code,
        tgt_code,
        request.text.len()
    );

    let text = request.text;
    let translation = tokio::task::spawn_blocking(move || {
        engine.translate(&text, &src_code, &tgt_code)
    })
    .await
    .map_err(|e| TranslateError::Internal(format!("generation task failed: {}", e)))??;

    Ok(Json(TranslateResponse { translation }))
}
