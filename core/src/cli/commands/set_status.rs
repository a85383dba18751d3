use crate::cli::OutputFormat;
use crate::reports::ReportStatus;
use colored::Colorize;

use super::{open_store, print_json};

pub fn run(
    ticket: &str,
    status: &str,
    version: Option<u64>,
    format: OutputFormat,
) -> Result<(), String> {
    let status: ReportStatus = status.parse()?;
    let store = open_store()?;
    let report = store
        .update_status(ticket, status, version)
        .map_err(|e| e.to_string())?;

    if format == OutputFormat::Json {
        return print_json(&report);
    }
    println!(
        "{} {} is now {} (v{})",
        "✓".green(),
        report.ticket_id.bold(),
        report.status.as_str().cyan(),
        report.version
    );
    Ok(())
}
