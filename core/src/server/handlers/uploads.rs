use crate::error::AppError;
use crate::server::error::ApiError;
use crate::server::extractors::Session;
use crate::server::state::SharedState;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub(in crate::server) struct UploadQuery {
    #[serde(default)]
    filename: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(in crate::server) struct UploadResponse {
    ok: bool,
    path: String,
    public_url: String,
}

/// POST /api/uploads?filename=photo.jpg with the raw file as the body.
pub async fn upload(
    State(state): State<SharedState>,
    Session(_): Session,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("File is required".to_owned()));
    }
    let filename = query.filename.unwrap_or_default();
    let stored = state
        .store
        .save_upload(&filename, &body, Utc::now())
        .map_err(AppError::from)?;
    Ok(Json(UploadResponse {
        ok: true,
        path: stored.path,
        public_url: stored.public_url,
    }))
}

fn content_type_for(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

/// GET /uploads/{*path}
pub async fn serve(
    State(state): State<SharedState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state.store.read_upload(&path).map_err(AppError::from)?;
    Ok(([(CONTENT_TYPE, content_type_for(&path))], bytes))
}
