use crate::classify::{rules, Rule};
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub(in crate::server) struct HealthResponse {
    ok: bool,
    version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /api/rules: the keyword rules in evaluation order.
pub async fn list_rules() -> Json<&'static [Rule]> {
    Json(rules())
}
