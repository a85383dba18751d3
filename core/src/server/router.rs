//! Router construction with all route groups.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use super::handlers::{analyze, auth, health, reports, uploads};
use super::middleware::log_request;
use super::state::SharedState;

/// Uploads are sent as raw request bodies.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Build the complete router with all REST routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        // --- System ---
        .route("/health", get(health::health))
        .route("/api/rules", get(health::list_rules))
        // --- Analysis ---
        .route("/api/analyze", post(analyze::analyze))
        // --- Sessions ---
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        // --- Reports ---
        .route("/api/reports", get(reports::lookup).post(reports::submit))
        .route("/api/admin/reports", get(reports::admin_list))
        .route(
            "/api/admin/reports/{ticket}/status",
            patch(reports::update_status),
        )
        // --- Uploads ---
        .route("/api/uploads", post(uploads::upload))
        .route("/uploads/{*path}", get(uploads::serve))
        // --- Middleware ---
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(axum::middleware::from_fn(log_request))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
