//! HTTP API for report submission and triage.

mod error;
mod extractors;
mod handlers;
mod middleware;
mod router;
mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::{AppState, SharedState};

use crate::config::Config;
use crate::error::AppError;
use log::info;
use std::sync::Arc;

/// Serve the API on `0.0.0.0:<config.port>` until Ctrl-C.
pub async fn run(config: Config) -> Result<(), AppError> {
    let port = config.port;
    let state: SharedState = Arc::new(AppState::new(config)?);
    info!("Data directory: {}", state.store.root().display());

    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
