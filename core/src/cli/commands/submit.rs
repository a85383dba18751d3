use crate::auth::is_valid_email;
use crate::classify::classify;
use crate::cli::OutputFormat;
use crate::reports::NewReport;
use colored::Colorize;

use super::{open_store, print_json, print_report};

pub fn run(
    text: &str,
    email: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    image_url: Option<String>,
    format: OutputFormat,
) -> Result<(), String> {
    let description = text.trim();
    if description.is_empty() {
        return Err("Description is required".to_owned());
    }

    let email = email.unwrap_or_default().trim().to_lowercase();
    if !email.is_empty() && !is_valid_email(&email) {
        return Err(format!("Invalid email: {email}"));
    }

    let store = open_store()?;
    let new = NewReport {
        description: description.to_owned(),
        image_url: image_url.unwrap_or_default(),
        latitude,
        longitude,
        email,
    };
    let report = store
        .insert(new, classify(description))
        .map_err(|e| e.to_string())?;

    if format == OutputFormat::Json {
        return print_json(&report);
    }
    println!("{} Filed {}", "✓".green(), report.ticket_id.bold());
    print_report(&report);
    Ok(())
}
