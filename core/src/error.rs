use serde::Serialize;
use thiserror::Error;

/// Unified error type for the civic application.
///
/// Serializes to JSON as `{ "type": ..., "details": ... }` so clients can
/// branch on the kind of failure.
#[derive(Error, Debug, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum AppError {
    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Auth error: {message}")]
    Auth { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Path traversal: {path}")]
    PathTraversal { path: String },

    #[error("Invalid input: {message}")]
    Invalid { message: String },
}

impl AppError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn path_traversal(path: impl Into<String>) -> Self {
        Self::PathTraversal { path: path.into() }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (user can retry or take action)
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Disk trouble may be transient; a conflict is resolved by
            // reloading and retrying.
            Self::Storage { .. } | Self::Conflict { .. } => true,
            Self::Auth { .. }
            | Self::Config { .. }
            | Self::NotFound { .. }
            | Self::PathTraversal { .. }
            | Self::Invalid { .. } => false,
        }
    }
}

impl From<crate::reports::StorageError> for AppError {
    fn from(err: crate::reports::StorageError) -> Self {
        use crate::reports::StorageError;
        match err {
            StorageError::NotFound(resource) => AppError::not_found(resource),
            StorageError::PathTraversal(path) => AppError::path_traversal(path),
            StorageError::VersionConflict { .. } => AppError::conflict(err.to_string()),
            StorageError::Io(e) => AppError::storage(format!("IO: {e}")),
            StorageError::Json(e) => AppError::storage(format!("JSON: {e}")),
            StorageError::TicketsExhausted(_) | StorageError::Random(_) => {
                AppError::storage(err.to_string())
            }
        }
    }
}

impl From<crate::auth::AuthError> for AppError {
    fn from(err: crate::auth::AuthError) -> Self {
        use crate::auth::AuthError;
        match err {
            AuthError::EmailRequired | AuthError::InvalidEmail => AppError::invalid(err.to_string()),
            AuthError::AdminNotConfigured => AppError::config(err.to_string()),
            AuthError::InvalidCredentials => AppError::auth(err.to_string()),
        }
    }
}

impl From<crate::auth::SessionError> for AppError {
    fn from(err: crate::auth::SessionError) -> Self {
        use crate::auth::SessionError;
        match err {
            SessionError::MissingSecret => AppError::config(err.to_string()),
            _ => AppError::auth(err.to_string()),
        }
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        AppError::config(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::storage(format!("IO: {err}"))
    }
}
