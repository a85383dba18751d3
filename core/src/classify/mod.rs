pub mod gemini;
pub mod prompt;
pub mod static_rules;

use serde::{Deserialize, Serialize};

pub use gemini::{analyze, AiError, GeminiClient, RawAnalysis, TextGenerator};
pub use static_rules::{classify, classify_opt, rules, Rule, DEFAULT_RULE};

/// Structured triage result attached to every report.
///
/// Field names on the wire are camelCase. The short names used by the
/// analysis prompt (`cat`, `prio`, ...) are accepted when deserializing so a
/// client can hand back a result it received from either source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    #[serde(alias = "cat")]
    pub category: String,
    /// 1..=10, higher is more urgent.
    #[serde(alias = "prio")]
    pub priority: u8,
    #[serde(alias = "msg")]
    pub risk_message: String,
    #[serde(alias = "time")]
    pub expected_response_time: String,
    #[serde(alias = "dept")]
    pub department: String,
    /// 1..=100, independent of priority.
    #[serde(alias = "score")]
    pub severity_score: u8,
}

/// Which classifier produced an [`Analysis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    Ai,
    Rules,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(flatten)]
    pub result: ClassificationResult,
    pub source: AnalysisSource,
}

impl Analysis {
    pub fn from_rules(text: &str) -> Self {
        Self {
            result: classify(text),
            source: AnalysisSource::Rules,
        }
    }
}
