use crate::auth::{is_valid_email, sign_session, verify_session, Role, SessionClaims};
use crate::cli::{OutputFormat, TokenAction};
use chrono::{DateTime, Utc};
use colored::Colorize;

use super::{load_config, print_json};

pub fn run(action: TokenAction, format: OutputFormat) -> Result<(), String> {
    let config = load_config()?;
    let secret = config.require_secret().map_err(|e| e.to_string())?;
    let now = Utc::now().timestamp();

    match action {
        TokenAction::Sign { email, admin } => {
            let email = email.trim().to_lowercase();
            if !is_valid_email(&email) {
                return Err(format!("Invalid email: {email}"));
            }
            let role = if admin { Role::Admin } else { Role::User };
            let claims = SessionClaims::new(role, email, now);
            let token = sign_session(&claims, secret).map_err(|e| e.to_string())?;

            if format == OutputFormat::Json {
                return print_json(&serde_json::json!({ "token": token, "claims": claims }));
            }
            println!("{token}");
            Ok(())
        }
        TokenAction::Verify { token } => {
            let claims = verify_session(token.trim(), secret, now).map_err(|e| e.to_string())?;

            if format == OutputFormat::Json {
                return print_json(&claims);
            }
            let expires = DateTime::<Utc>::from_timestamp(claims.exp, 0)
                .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_default();
            println!(
                "{} {} ({})",
                "✓".green(),
                claims.email.bold(),
                claims.role.as_str()
            );
            println!("  Expires {expires}");
            Ok(())
        }
    }
}
