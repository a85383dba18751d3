//! Rule-based civic report classifier.
//!
//! Lower-cases the description and tests it against an ordered list of
//! keyword rules. The first rule whose pattern matches anywhere in the text
//! wins; categories are never combined. Text matching no rule falls through
//! to [`DEFAULT_RULE`].
//!
//! Order matters: Infrastructure, then Utilities, then Public Safety, then
//! Sanitation. "pothole near a gas leak" is therefore Infrastructure even
//! though Public Safety carries a higher priority.

use crate::classify::ClassificationResult;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// A keyword rule and the triage record it produces.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub category: &'static str,
    pub keywords: &'static [&'static str],
    pub priority: u8,
    pub severity_score: u8,
    pub risk_message: &'static str,
    pub expected_response_time: &'static str,
    pub department: &'static str,
}

impl Rule {
    pub fn to_result(&self) -> ClassificationResult {
        ClassificationResult {
            category: self.category.to_owned(),
            priority: self.priority,
            risk_message: self.risk_message.to_owned(),
            expected_response_time: self.expected_response_time.to_owned(),
            department: self.department.to_owned(),
            severity_score: self.severity_score,
        }
    }
}

const RULES: &[Rule] = &[
    Rule {
        category: "Infrastructure",
        keywords: &["pothole", "road", "bridge", "crack", "asphalt"],
        priority: 4,
        severity_score: 45,
        risk_message: "Surface degradation detected. Monitoring for structural failure.",
        expected_response_time: "2-3 Business Days",
        department: "DOT",
    },
    Rule {
        category: "Utilities",
        keywords: &["leak", "water", "flood", "drain", "sewage", "pipe"],
        priority: 7,
        severity_score: 75,
        risk_message: "Hydraulic pressure anomaly or fluid breach detected.",
        expected_response_time: "Under 12 Hours",
        department: "Water & Power",
    },
    Rule {
        category: "Public Safety",
        keywords: &[
            "danger",
            "wire",
            "fire",
            "hazard",
            "collapsed",
            "electric",
            "gas",
        ],
        priority: 10,
        severity_score: 95,
        risk_message: "Immediate threat to life or property detected.",
        expected_response_time: "Emergency Dispatch",
        department: "Emergency Services",
    },
    Rule {
        category: "Sanitation",
        keywords: &["trash", "garbage", "waste", "smell", "litter"],
        priority: 2,
        severity_score: 25,
        risk_message: "Environmental hygiene and waste management log.",
        expected_response_time: "48-72 Hours",
        department: "Public Works",
    },
];

/// Record returned when no keyword rule matches.
pub const DEFAULT_RULE: Rule = Rule {
    category: "General Maintenance",
    keywords: &[],
    priority: 1,
    severity_score: 15,
    risk_message: "Routine urban logging.",
    expected_response_time: "3-5 Business Days",
    department: "Public Works",
};

/// One compiled alternation per entry in `RULES`, same order.
static RULE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    RULES
        .iter()
        .map(|rule| {
            let alternation = rule
                .keywords
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            Regex::new(&format!("({alternation})")).unwrap()
        })
        .collect()
});

/// The keyword rules in evaluation order (the default is not included).
pub fn rules() -> &'static [Rule] {
    RULES
}

/// Find the first rule matching already-normalized text.
fn matching_rule(normalized: &str) -> &'static Rule {
    RULES
        .iter()
        .zip(RULE_PATTERNS.iter())
        .find(|(_, pattern)| pattern.is_match(normalized))
        .map_or(&DEFAULT_RULE, |(rule, _)| rule)
}

/// Classify a free-text issue description. Never fails.
pub fn classify(text: &str) -> ClassificationResult {
    let input = text.to_lowercase();
    matching_rule(&input).to_result()
}

/// Like [`classify`], treating a missing description as empty.
pub fn classify_opt(text: Option<&str>) -> ClassificationResult {
    classify(text.unwrap_or_default())
}
