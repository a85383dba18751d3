pub mod session;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

pub use session::{sign_session, verify_session, SessionClaims, SessionError, SESSION_TTL_SECS};

pub const SESSION_COOKIE_NAME: &str = "civicsens_session";

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Whether a session with this role satisfies `required`.
    /// Admins can do everything a user can.
    pub fn permits(self, required: Role) -> bool {
        match required {
            Role::User => true,
            Role::Admin => self == Role::Admin,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    #[error("Email is required")]
    EmailRequired,
    #[error("Enter a valid email")]
    InvalidEmail,
    #[error("Admin auth is not configured (ADMIN_EMAIL / ADMIN_PASSWORD)")]
    AdminNotConfigured,
    #[error("Invalid admin credentials")]
    InvalidCredentials,
}

/// Login form as submitted by a client. Unknown roles log in as `user`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Administrator credentials from the environment.
#[derive(Debug, Clone, Default)]
pub struct AdminCredentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Check a login request and return the role and normalized email to sign.
pub fn login(request: &LoginRequest, admin: &AdminCredentials) -> Result<(Role, String), AuthError> {
    let role = if request.role.as_deref() == Some("admin") {
        Role::Admin
    } else {
        Role::User
    };
    let email = request
        .email
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    if email.is_empty() {
        return Err(AuthError::EmailRequired);
    }
    if !is_valid_email(&email) {
        return Err(AuthError::InvalidEmail);
    }

    if role == Role::Admin {
        let admin_email = admin
            .email
            .as_deref()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        let admin_password = admin.password.as_deref().unwrap_or_default();
        if admin_email.is_empty() || admin_password.is_empty() {
            return Err(AuthError::AdminNotConfigured);
        }
        let password = request.password.as_deref().unwrap_or_default();
        let email_ok = email == admin_email;
        let password_ok = session::secrets_equal(password, admin_password);
        if !(email_ok && password_ok) {
            return Err(AuthError::InvalidCredentials);
        }
    }

    Ok((role, email))
}

/// `Set-Cookie` value carrying a session token.
pub fn session_cookie(token: &str, secure: bool) -> String {
    cookie_header(token, SESSION_TTL_SECS, secure)
}

/// `Set-Cookie` value that clears the session.
pub fn clear_session_cookie(secure: bool) -> String {
    cookie_header("", 0, secure)
}

fn cookie_header(value: &str, max_age: i64, secure: bool) -> String {
    let mut cookie =
        format!("{SESSION_COOKIE_NAME}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Pull the session token out of a `Cookie` request header.
pub fn token_from_cookie_header(header: &str) -> Option<&str> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE_NAME && !value.is_empty()).then_some(value)
    })
}
