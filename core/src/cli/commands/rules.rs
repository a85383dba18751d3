use crate::classify::{rules, DEFAULT_RULE};
use crate::cli::OutputFormat;
use colored::Colorize;

use super::print_json;

pub fn run(format: OutputFormat) -> Result<(), String> {
    let rules = rules();

    if format == OutputFormat::Json {
        let output = serde_json::json!({
            "rules": rules,
            "default": DEFAULT_RULE,
        });
        return print_json(&output);
    }

    for (i, rule) in rules.iter().enumerate() {
        println!(
            "{}. {} (priority {}, severity {})",
            i + 1,
            rule.category.bold().cyan(),
            rule.priority,
            rule.severity_score
        );
        println!("   {}", rule.keywords.join(", ").green());
        println!(
            "   {} · {}",
            rule.department,
            rule.expected_response_time.dimmed()
        );
    }
    println!();
    println!(
        "Otherwise: {} (priority {}, severity {})",
        DEFAULT_RULE.category.bold(),
        DEFAULT_RULE.priority,
        DEFAULT_RULE.severity_score
    );
    Ok(())
}
