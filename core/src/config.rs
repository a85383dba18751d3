//! Runtime configuration read from the environment.

use crate::auth::AdminCredentials;
use crate::classify::gemini::DEFAULT_MODEL;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Could not determine home directory")]
    Home,
    #[error("AUTH_SECRET is required")]
    MissingSecret,
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Data directory holding reports and uploads.
    pub home: PathBuf,
    pub auth_secret: Option<String>,
    pub admin: AdminCredentials,
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    pub port: u16,
    /// Marks cookies `Secure`.
    pub production: bool,
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Return the data directory: `$CIVIC_HOME` if set, otherwise `~/.civic/`.
pub fn default_home() -> Result<PathBuf, ConfigError> {
    if let Some(home) = non_empty_var("CIVIC_HOME") {
        return Ok(PathBuf::from(home));
    }
    let home = dirs::home_dir().ok_or(ConfigError::Home)?;
    Ok(home.join(".civic"))
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match non_empty_var("CIVIC_PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "CIVIC_PORT",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            home: default_home()?,
            auth_secret: non_empty_var("AUTH_SECRET"),
            admin: AdminCredentials {
                email: non_empty_var("ADMIN_EMAIL"),
                // Passwords are taken verbatim, surrounding spaces included.
                password: std::env::var("ADMIN_PASSWORD").ok().filter(|p| !p.is_empty()),
            },
            google_api_key: non_empty_var("GOOGLE_API_KEY"),
            gemini_model: non_empty_var("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            port,
            production: non_empty_var("CIVIC_ENV").is_some_and(|v| v == "production"),
        })
    }

    /// The session signing secret, required for anything touching sessions.
    pub fn require_secret(&self) -> Result<&[u8], ConfigError> {
        self.auth_secret
            .as_deref()
            .map(str::as_bytes)
            .ok_or(ConfigError::MissingSecret)
    }
}
