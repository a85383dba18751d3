use crate::cli::OutputFormat;
use crate::reports::StorageError;

use super::{open_store, print_json, print_report};

pub fn run(ticket: &str, format: OutputFormat) -> Result<(), String> {
    let store = open_store()?;
    let report = match store.get(ticket) {
        Ok(report) => report,
        Err(StorageError::NotFound(ticket)) => return Err(format!("No report {ticket}")),
        Err(e) => return Err(e.to_string()),
    };

    if format == OutputFormat::Json {
        return print_json(&report);
    }
    print_report(&report);
    Ok(())
}
