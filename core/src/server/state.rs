//! Shared application state for the HTTP server.

use crate::classify::GeminiClient;
use crate::config::Config;
use crate::error::AppError;
use crate::reports::ReportStore;
use log::{info, warn};
use std::sync::Arc;

/// Shared state accessible by all handlers via axum's State extractor.
pub struct AppState {
    pub config: Config,
    pub store: ReportStore,
    /// `None` when no API key is configured; analysis then uses the rules only.
    pub gemini: Option<GeminiClient>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let store = ReportStore::open(&config.home)?;

        let gemini = match config.google_api_key.as_deref() {
            Some(key) => match GeminiClient::new(key, config.gemini_model.as_str()) {
                Ok(client) => {
                    info!("Model analysis enabled ({})", client.model());
                    Some(client)
                }
                Err(e) => {
                    warn!("Model client unavailable, using rule classifier only: {e}");
                    None
                }
            },
            None => {
                info!("GOOGLE_API_KEY not set, using rule classifier only");
                None
            }
        };

        Ok(Self {
            config,
            store,
            gemini,
        })
    }
}
