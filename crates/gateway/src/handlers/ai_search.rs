//! AI search handlers

use crate::AppState;
use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use saathi_common::{errors::Result, AiSearchResponse};

/// Answer a marketplace question from stored content.
///
/// The body is decoded inside the pipeline so that every failure, malformed
/// JSON included, surfaces as `500 {"error": ...}`.
pub async fn ai_search(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AiSearchResponse>> {
    let response = state.search.answer_raw(&body).await?;
    Ok(Json(response))
}

/// CORS preflight: empty body, headers come from the router layers
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}
