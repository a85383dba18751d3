pub mod classify;
pub mod list;
pub mod lookup;
pub mod rules;
pub mod set_status;
pub mod submit;
pub mod token;

use crate::classify::ClassificationResult;
use crate::config::Config;
use crate::reports::{Report, ReportStore};
use colored::{ColoredString, Colorize};

fn load_config() -> Result<Config, String> {
    Config::from_env().map_err(|e| e.to_string())
}

/// Open the report store in the configured data directory.
fn open_store() -> Result<ReportStore, String> {
    let config = load_config()?;
    ReportStore::open(&config.home).map_err(|e| e.to_string())
}

/// Serialize a value as pretty-printed JSON and print it to stdout.
fn print_json(value: &impl serde::Serialize) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

/// Color a priority by urgency band.
fn priority_label(priority: u8) -> ColoredString {
    let label = format!("P{priority}");
    match priority {
        7.. => label.red().bold(),
        4..=6 => label.yellow(),
        _ => label.green(),
    }
}

fn print_classification(result: &ClassificationResult) {
    println!(
        "{} {}",
        result.category.bold().cyan(),
        priority_label(result.priority)
    );
    println!("  Severity:   {}/100", result.severity_score);
    println!("  Department: {}", result.department);
    println!("  Response:   {}", result.expected_response_time);
    println!("  {}", result.risk_message.dimmed());
}

fn print_report(report: &Report) {
    println!(
        "{} {} [{}]",
        report.ticket_id.bold(),
        priority_label(report.priority_level),
        report.status.to_string().cyan()
    );
    println!("  {}", report.description);
    println!(
        "  {} · {} · severity {}/100",
        report.category, report.department, report.severity_score
    );
    println!("  Expected response: {}", report.expected_response_time);
    if !report.email.is_empty() {
        println!("  Reporter: {}", report.email);
    }
    if let (Some(lat), Some(lon)) = (report.latitude, report.longitude) {
        println!("  Location: {lat:.5}, {lon:.5}");
    }
    if !report.image_url.is_empty() {
        println!("  Photo: {}", report.image_url);
    }
    println!(
        "  Filed {} (v{})",
        report.created_at.format("%Y-%m-%d %H:%M UTC").to_string().dimmed(),
        report.version
    );
}
