use crate::auth::{
    self, clear_session_cookie, session_cookie, sign_session, LoginRequest, Role, SessionClaims,
};
use crate::error::AppError;
use crate::server::error::ApiError;
use crate::server::extractors::{JsonBody, MaybeSession};
use crate::server::state::SharedState;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use log::info;
use serde::Serialize;

#[derive(Serialize)]
pub(in crate::server) struct LoginResponse {
    ok: bool,
    role: Role,
    email: String,
}

#[derive(Serialize)]
pub(in crate::server) struct SessionResponse {
    ok: bool,
    session: Option<SessionClaims>,
}

pub async fn login(
    State(state): State<SharedState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (role, email) = auth::login(&request, &state.config.admin).map_err(AppError::from)?;
    let secret = state.config.require_secret().map_err(AppError::from)?;

    let claims = SessionClaims::new(role, email.clone(), Utc::now().timestamp());
    let token = sign_session(&claims, secret).map_err(AppError::from)?;
    info!("Signed in {email} as {}", role.as_str());

    let cookie = session_cookie(&token, state.config.production);
    Ok((
        [(SET_COOKIE, cookie)],
        Json(LoginResponse {
            ok: true,
            role,
            email,
        }),
    ))
}

pub async fn logout(State(state): State<SharedState>) -> impl IntoResponse {
    (
        [(SET_COOKIE, clear_session_cookie(state.config.production))],
        Json(serde_json::json!({ "ok": true })),
    )
}

pub async fn me(MaybeSession(session): MaybeSession) -> Json<SessionResponse> {
    Json(SessionResponse { ok: true, session })
}
