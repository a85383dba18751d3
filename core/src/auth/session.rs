//! Signed session tokens.
//!
//! Format: `base64url(json claims) "." base64url(hmac_sha256(secret, body))`,
//! both parts unpadded.

use super::Role;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Session lifetime in seconds (8 hours).
pub const SESSION_TTL_SECS: i64 = 60 * 60 * 8;

/// Tokens longer than this are rejected before any decoding.
const MAX_TOKEN_LEN: usize = 4096;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session secret is empty")]
    MissingSecret,
    #[error("Malformed session token")]
    Malformed,
    #[error("Session signature mismatch")]
    BadSignature,
    #[error("Session payload is invalid: {0}")]
    InvalidPayload(String),
    #[error("Session expired")]
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub role: Role,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    /// Claims issued at `now` with the default lifetime.
    pub fn new(role: Role, email: impl Into<String>, now: i64) -> Self {
        Self {
            role,
            email: email.into(),
            iat: now,
            exp: now + SESSION_TTL_SECS,
        }
    }
}

fn mac_for(secret: &[u8]) -> Result<HmacSha256, SessionError> {
    if secret.is_empty() {
        return Err(SessionError::MissingSecret);
    }
    HmacSha256::new_from_slice(secret).map_err(|_| SessionError::MissingSecret)
}

/// Sign claims into a session token.
pub fn sign_session(claims: &SessionClaims, secret: &[u8]) -> Result<String, SessionError> {
    let json = serde_json::to_vec(claims)
        .map_err(|e| SessionError::InvalidPayload(e.to_string()))?;
    let body = URL_SAFE_NO_PAD.encode(json);
    let mut mac = mac_for(secret)?;
    mac.update(body.as_bytes());
    let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    Ok(format!("{body}.{sig}"))
}

/// Verify a token's signature and expiry, returning its claims.
pub fn verify_session(token: &str, secret: &[u8], now: i64) -> Result<SessionClaims, SessionError> {
    if token.is_empty() || token.len() > MAX_TOKEN_LEN {
        return Err(SessionError::Malformed);
    }
    let parts: Vec<&str> = token.split('.').collect();
    let [body, sig] = parts.as_slice() else {
        return Err(SessionError::Malformed);
    };

    let mut mac = mac_for(secret)?;
    mac.update(body.as_bytes());
    let expected = URL_SAFE_NO_PAD
        .decode(sig)
        .map_err(|_| SessionError::BadSignature)?;
    mac.verify_slice(&expected)
        .map_err(|_| SessionError::BadSignature)?;

    let json = URL_SAFE_NO_PAD
        .decode(body)
        .map_err(|e| SessionError::InvalidPayload(e.to_string()))?;
    let claims: SessionClaims = serde_json::from_slice(&json)
        .map_err(|e| SessionError::InvalidPayload(e.to_string()))?;

    if claims.exp <= now {
        return Err(SessionError::Expired);
    }
    Ok(claims)
}

/// Constant-time equality for secrets supplied by a client.
pub(crate) fn secrets_equal(provided: &str, expected: &str) -> bool {
    // Keyed with the expected value, so comparing MACs never leaks its length.
    let Ok(mut mac) = HmacSha256::new_from_slice(expected.as_bytes()) else {
        return false;
    };
    mac.update(provided.as_bytes());
    let Ok(mut reference) = HmacSha256::new_from_slice(expected.as_bytes()) else {
        return false;
    };
    reference.update(expected.as_bytes());
    mac.verify_slice(&reference.finalize().into_bytes()).is_ok()
}
