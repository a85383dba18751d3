use crate::cli::OutputFormat;
use crate::reports::{DashboardMetrics, Report};
use chrono::Utc;
use colored::Colorize;

use super::{open_store, print_json, priority_label};

pub fn run(query: Option<&str>, format: OutputFormat) -> Result<(), String> {
    let store = open_store()?;
    let all = store.list().map_err(|e| e.to_string())?;
    let metrics = DashboardMetrics::compute(&all, Utc::now().date_naive());

    let term = query.unwrap_or_default();
    let reports: Vec<&Report> = all.iter().filter(|r| r.matches_search(term)).collect();

    if format == OutputFormat::Json {
        let output = serde_json::json!({
            "reports": reports,
            "metrics": metrics,
        });
        return print_json(&output);
    }

    println!(
        "{} total · {} critical · {} resolved today",
        metrics.total.to_string().bold(),
        metrics.critical.to_string().red().bold(),
        metrics.resolved_today.to_string().green()
    );
    println!();

    if reports.is_empty() {
        println!("{}", "No reports".dimmed());
        return Ok(());
    }

    for report in reports {
        println!(
            "{}  {}  {:<20} {:<11} {}",
            report.ticket_id.bold(),
            priority_label(report.priority_level),
            report.category,
            report.status.as_str(),
            truncate(&report.description, 60).dimmed()
        );
    }
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}
