use crate::classify::{self as classifier, Analysis, GeminiClient};
use crate::cli::OutputFormat;
use colored::Colorize;

use super::{load_config, print_classification, print_json};

pub fn run(text: &str, format: OutputFormat) -> Result<(), String> {
    let result = classifier::classify(text);
    if format == OutputFormat::Json {
        return print_json(&result);
    }
    print_classification(&result);
    Ok(())
}

/// Analyze with Gemini when `GOOGLE_API_KEY` is set; otherwise the rules answer.
pub fn run_analyze(text: &str, format: OutputFormat) -> Result<(), String> {
    let config = load_config()?;
    let client = match config.google_api_key.as_deref() {
        Some(key) => Some(
            GeminiClient::new(key, config.gemini_model.as_str()).map_err(|e| e.to_string())?,
        ),
        None => None,
    };

    let rt = tokio::runtime::Runtime::new().map_err(|e| e.to_string())?;
    let analysis: Analysis = rt.block_on(classifier::analyze(client.as_ref(), text));

    if format == OutputFormat::Json {
        return print_json(&analysis);
    }
    print_classification(&analysis.result);
    println!(
        "  {}",
        format!("source: {}", source_name(&analysis)).dimmed()
    );
    Ok(())
}

fn source_name(analysis: &Analysis) -> &'static str {
    match analysis.source {
        classifier::AnalysisSource::Ai => "model",
        classifier::AnalysisSource::Rules => "keyword rules",
    }
}
