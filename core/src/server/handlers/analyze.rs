use crate::classify::{self, Analysis};
use crate::server::error::ApiError;
use crate::server::extractors::JsonBody;
use crate::server::state::SharedState;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

#[derive(Deserialize)]
pub(in crate::server) struct AnalyzeRequest {
    #[serde(default)]
    description: Option<String>,
}

/// POST /api/analyze: model analysis with rule fallback. Never fails on
/// model errors; only an empty description is rejected.
pub async fn analyze(
    State(state): State<SharedState>,
    JsonBody(request): JsonBody<AnalyzeRequest>,
) -> Result<Json<Analysis>, ApiError> {
    let description = request.description.unwrap_or_default();
    let description = description.trim();
    if description.is_empty() {
        return Err(ApiError::BadRequest("Description required".to_owned()));
    }
    Ok(Json(
        classify::analyze(state.gemini.as_ref(), description).await,
    ))
}
