//! Custom axum extractors: JSON bodies and the signed session cookie.

use super::error::ApiError;
use super::state::SharedState;
use crate::auth::{token_from_cookie_header, verify_session, Role, SessionClaims};
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use chrono::Utc;
use log::debug;

/// Verify the session cookie, if any. Every failure reads as "no session".
fn session_from_parts(parts: &Parts, state: &SharedState) -> Option<SessionClaims> {
    let secret = state.config.require_secret().ok()?;
    let token = parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(token_from_cookie_header)?;

    match verify_session(token, secret, Utc::now().timestamp()) {
        Ok(claims) => Some(claims),
        Err(e) => {
            debug!("Rejected session cookie: {e}");
            None
        }
    }
}

/// Any signed-in caller (citizen or administrator).
pub struct Session(pub SessionClaims);

impl FromRequestParts<SharedState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        session_from_parts(parts, state)
            .map(Session)
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized".to_owned()))
    }
}

/// A signed-in administrator.
pub struct AdminSession(pub SessionClaims);

impl FromRequestParts<SharedState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let Session(claims) = Session::from_request_parts(parts, state).await?;
        if !claims.role.permits(Role::Admin) {
            return Err(ApiError::Forbidden("Admin access required".to_owned()));
        }
        Ok(AdminSession(claims))
    }
}

/// The session if present; never rejects.
pub struct MaybeSession(pub Option<SessionClaims>);

impl FromRequestParts<SharedState> for MaybeSession {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeSession(session_from_parts(parts, state)))
    }
}

/// A JSON request body. Unlike `axum::Json`, a missing content type or an
/// unparsable body is rejected with the API's JSON error format.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(request, state)
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e.body_text())))?;
        Ok(JsonBody(value))
    }
}
