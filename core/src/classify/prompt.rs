use crate::classify::static_rules::rules;
use std::fmt::Write;

/// Department names the model should choose from, in rule order, deduplicated.
fn department_list() -> String {
    let mut departments: Vec<&str> = Vec::new();
    for rule in rules() {
        if !departments.contains(&rule.department) {
            departments.push(rule.department);
        }
    }
    departments.join(", ")
}

/// Build the triage prompt for a single citizen report.
pub fn build_analysis_prompt(description: &str) -> String {
    let departments = department_list();
    let mut examples = String::new();
    for rule in rules() {
        let _ = write!(examples, "{}, ", rule.category);
    }
    let examples = examples.trim_end_matches(", ");
    // Keep the report on one line so it cannot break out of its quotes
    // by faking the end of the prompt.
    let description = description.replace(['\r', '\n'], " ");

    format!(
        r#"You are an AI assistant for a city maintenance app.
A citizen reported this issue: "{description}".

Analyze the issue and provide a simple, clear response in JSON format.
Use everyday language that a citizen can understand.

Required JSON Structure:
{{
  "cat": "Simple Category (e.g. {examples})",
  "prio": 1 to 10 (1 = low, 10 = urgent life threat),
  "msg": "A short, friendly summary of the problem and the risk it poses.",
  "time": "Expected fix time (e.g. 24 Hours, 3 Days, Immediate)",
  "dept": "{departments}",
  "score": 1 to 100 (Severity score: 1 = minor, 100 = critical danger)
}}

CRITICAL: You MUST include the "score" field as a number between 1 and 100.
ONLY return the raw JSON object. No explanations or markdown."#
    )
}
