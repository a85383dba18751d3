//! LLM-backed report analysis with the rule classifier as fallback.
//!
//! The model is asked for a JSON object with the same fields as
//! [`ClassificationResult`]. Any failure along the way (no API key, network
//! error, non-200 status, empty or unparsable output) degrades to the local
//! rule classifier so callers always get a result.

use crate::classify::prompt::build_analysis_prompt;
use crate::classify::{classify, Analysis, AnalysisSource, ClassificationResult};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_PRIORITY: i64 = 1;
const DEFAULT_SEVERITY: i64 = 20;
const UNASSIGNED_DEPARTMENT: &str = "Unassigned";

#[derive(Error, Debug)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Model API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Empty response from model")]
    EmptyResponse,
    #[error("Failed to parse model response: {0}")]
    ParseError(String),
}

/// Anything that can turn a prompt into raw model text.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, AiError>> + Send;
}

/// Client for the Gemini `generateContent` REST endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
        })
    }

    /// Point the client at a different host (proxies, local emulators).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AiError::EmptyResponse);
        }
        Ok(text)
    }
}

/// Extract the JSON object from model output, handling markdown fences
/// and surrounding prose.
pub(crate) fn extract_json_str(output: &str) -> Result<&str, AiError> {
    let trimmed = output.trim();

    if let Some(start) = trimmed.find("```json") {
        let after_marker = &trimmed[start + 7..];
        if let Some(end) = after_marker.find("```") {
            return Ok(after_marker[..end].trim());
        }
        return Ok(after_marker.trim());
    }

    if let Some(start) = trimmed.find("```") {
        let after_marker = &trimmed[start + 3..];
        let after_newline = after_marker
            .find('\n')
            .map_or(after_marker, |i| &after_marker[i + 1..]);
        if let Some(end) = after_newline.find("```") {
            return Ok(after_newline[..end].trim());
        }
        return Ok(after_newline.trim());
    }

    if trimmed.starts_with('{') {
        return Ok(trimmed);
    }

    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            if end > start {
                return Ok(&trimmed[start..=end]);
            }
        }
        return Err(AiError::ParseError(
            "Could not find complete JSON object".to_owned(),
        ));
    }

    let mut cut = trimmed.len().min(200);
    while !trimmed.is_char_boundary(cut) {
        cut -= 1;
    }
    Err(AiError::ParseError(format!(
        "No JSON found in output: {}",
        &trimmed[..cut]
    )))
}

/// A classification as loosely typed JSON, from the model or from a client.
/// Every field is optional and numbers may arrive as strings.
#[derive(Debug, Default, Deserialize)]
pub struct RawAnalysis {
    #[serde(alias = "cat")]
    category: Option<String>,
    #[serde(alias = "prio")]
    priority: Option<serde_json::Value>,
    #[serde(alias = "msg", alias = "riskMessage")]
    risk_message: Option<String>,
    #[serde(alias = "time", alias = "expectedResponseTime")]
    expected_response_time: Option<String>,
    #[serde(alias = "dept")]
    department: Option<String>,
    #[serde(alias = "score", alias = "severityScore")]
    severity_score: Option<serde_json::Value>,
}

/// Integer prefix of a JSON number or numeric string ("7", "7/10", 7.9).
fn leading_integer(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        serde_json::Value::String(s) => {
            let s = s.trim();
            let (sign, digits) = match s.strip_prefix('-') {
                Some(rest) => (-1, rest),
                None => (1, s.strip_prefix('+').unwrap_or(s)),
            };
            let end = digits
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(digits.len());
            digits[..end].parse::<i64>().ok().map(|n| sign * n)
        }
        _ => None,
    }
}

/// Missing, zero and unparsable values take the default; the rest is clamped.
fn normalize_number(value: Option<&serde_json::Value>, default: i64, max: i64) -> u8 {
    let n = value
        .and_then(leading_integer)
        .filter(|&n| n != 0)
        .unwrap_or(default);
    n.clamp(1, max) as u8
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

fn normalize(raw: RawAnalysis, text: &str) -> ClassificationResult {
    let rules = classify(text);
    ClassificationResult {
        category: non_empty(raw.category).unwrap_or(rules.category),
        priority: normalize_number(raw.priority.as_ref(), DEFAULT_PRIORITY, 10),
        risk_message: non_empty(raw.risk_message).unwrap_or(rules.risk_message),
        expected_response_time: non_empty(raw.expected_response_time)
            .unwrap_or(rules.expected_response_time),
        department: non_empty(raw.department)
            .unwrap_or_else(|| UNASSIGNED_DEPARTMENT.to_owned()),
        severity_score: normalize_number(raw.severity_score.as_ref(), DEFAULT_SEVERITY, 100),
    }
}

impl RawAnalysis {
    /// Fill gaps and clamp ranges; `text` is classified by the rules to
    /// supply a missing category, risk message or response time.
    pub fn into_result(self, text: &str) -> ClassificationResult {
        normalize(self, text)
    }
}

/// Parse raw model output into a normalized result.
pub fn parse_model_output(output: &str, text: &str) -> Result<ClassificationResult, AiError> {
    let json_str = extract_json_str(output)?;
    let raw: RawAnalysis = serde_json::from_str(json_str).map_err(|e| {
        AiError::ParseError(format!(
            "JSON parse error: {}. Input: {}",
            e,
            json_str.chars().take(500).collect::<String>()
        ))
    })?;
    Ok(normalize(raw, text))
}

async fn analyze_with_model<G: TextGenerator>(
    generator: &G,
    text: &str,
) -> Result<ClassificationResult, AiError> {
    let prompt = build_analysis_prompt(text);
    let output = generator.generate(&prompt).await?;
    debug!("Raw model response: {}", output.trim());
    parse_model_output(&output, text)
}

/// Analyze a report with the model when one is configured, falling back to
/// the rule classifier on any error.
pub async fn analyze<G: TextGenerator>(generator: Option<&G>, text: &str) -> Analysis {
    let Some(generator) = generator else {
        return Analysis::from_rules(text);
    };

    match analyze_with_model(generator, text).await {
        Ok(result) => Analysis {
            result,
            source: AnalysisSource::Ai,
        },
        Err(e) => {
            warn!("Model analysis failed, using rule classifier: {e}");
            Analysis::from_rules(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(Result<&'static str, &'static str>);

    impl TextGenerator for Canned {
        async fn generate(&self, _prompt: &str) -> Result<String, AiError> {
            match self.0 {
                Ok(text) => Ok(text.to_owned()),
                Err(msg) => Err(AiError::ParseError(msg.to_owned())),
            }
        }
    }

    #[test]
    fn test_extract_json_fenced() {
        let output = "```json\n{\"cat\": \"Roads\"}\n```";
        assert_eq!(extract_json_str(output).unwrap(), "{\"cat\": \"Roads\"}");
    }

    #[test]
    fn test_extract_json_plain_fence() {
        let output = "```\n{\"cat\": \"Roads\"}\n```";
        assert_eq!(extract_json_str(output).unwrap(), "{\"cat\": \"Roads\"}");
    }

    #[test]
    fn test_extract_json_with_prose() {
        let output = "Here you go: {\"cat\": \"Roads\"} hope it helps";
        assert_eq!(extract_json_str(output).unwrap(), "{\"cat\": \"Roads\"}");
    }

    #[test]
    fn test_extract_json_missing() {
        assert!(matches!(
            extract_json_str("no json here"),
            Err(AiError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_short_names() {
        let output = r#"{"cat":"Roads","prio":8,"msg":"Deep hole","time":"24 Hours","dept":"DOT","score":70}"#;
        let result = parse_model_output(output, "hole").unwrap();
        assert_eq!(result.category, "Roads");
        assert_eq!(result.priority, 8);
        assert_eq!(result.risk_message, "Deep hole");
        assert_eq!(result.expected_response_time, "24 Hours");
        assert_eq!(result.department, "DOT");
        assert_eq!(result.severity_score, 70);
    }

    #[test]
    fn test_parse_numeric_strings_and_defaults() {
        let output = r#"{"cat":"Water","prio":"7/10","msg":"Leak"}"#;
        let result = parse_model_output(output, "leak").unwrap();
        assert_eq!(result.priority, 7);
        assert_eq!(result.severity_score, 20);
        assert_eq!(result.department, "Unassigned");
        // Missing time comes from the rule classifier for the same text.
        assert_eq!(result.expected_response_time, "Under 12 Hours");
    }

    #[test]
    fn test_parse_clamps_out_of_range() {
        let output = r#"{"cat":"X","prio":42,"score":-5,"msg":"m","time":"t","dept":"d"}"#;
        let result = parse_model_output(output, "").unwrap();
        assert_eq!(result.priority, 10);
        assert_eq!(result.severity_score, 1);
    }

    #[test]
    fn test_parse_zero_and_garbage_use_defaults() {
        let output = r#"{"cat":"X","prio":0,"score":"high"}"#;
        let result = parse_model_output(output, "").unwrap();
        assert_eq!(result.priority, 1);
        assert_eq!(result.severity_score, 20);
    }

    #[test]
    fn test_reviewed_classification_fills_gaps() {
        let raw: RawAnalysis =
            serde_json::from_str(r#"{"cat":"Public Safety","prio":42,"msg":"Falling branch"}"#)
                .unwrap();
        let result = raw.into_result("branch over the water main");
        assert_eq!(result.category, "Public Safety");
        assert_eq!(result.priority, 10);
        assert_eq!(result.risk_message, "Falling branch");
        // Missing time comes from the rules; missing department and score use defaults.
        assert_eq!(result.expected_response_time, "Under 12 Hours");
        assert_eq!(result.department, "Unassigned");
        assert_eq!(result.severity_score, 20);
    }

    #[test]
    fn test_leading_integer() {
        use serde_json::json;
        assert_eq!(leading_integer(&json!(5)), Some(5));
        assert_eq!(leading_integer(&json!(5.9)), Some(5));
        assert_eq!(leading_integer(&json!(" 12 ")), Some(12));
        assert_eq!(leading_integer(&json!("-3")), Some(-3));
        assert_eq!(leading_integer(&json!("abc")), None);
        assert_eq!(leading_integer(&json!(null)), None);
    }

    #[tokio::test]
    async fn test_analyze_without_model_uses_rules() {
        let analysis = analyze::<Canned>(None, "pothole").await;
        assert_eq!(analysis.source, AnalysisSource::Rules);
        assert_eq!(analysis.result, classify("pothole"));
    }

    #[tokio::test]
    async fn test_analyze_uses_model_output() {
        let model = Canned(Ok(
            "```json\n{\"cat\":\"Roads\",\"prio\":6,\"msg\":\"m\",\"time\":\"t\",\"dept\":\"DOT\",\"score\":55}\n```",
        ));
        let analysis = analyze(Some(&model), "pothole").await;
        assert_eq!(analysis.source, AnalysisSource::Ai);
        assert_eq!(analysis.result.category, "Roads");
        assert_eq!(analysis.result.severity_score, 55);
    }

    #[tokio::test]
    async fn test_analyze_falls_back_on_error() {
        let model = Canned(Err("unreachable"));
        let analysis = analyze(Some(&model), "Exposed electrical wire").await;
        assert_eq!(analysis.source, AnalysisSource::Rules);
        assert_eq!(analysis.result.category, "Public Safety");
    }

    #[tokio::test]
    async fn test_analyze_falls_back_on_garbage() {
        let model = Canned(Ok("I cannot help with that."));
        let analysis = analyze(Some(&model), "trash").await;
        assert_eq!(analysis.source, AnalysisSource::Rules);
        assert_eq!(analysis.result.category, "Sanitation");
    }

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new("k", "gemini-test")
            .unwrap()
            .with_base_url("http://localhost:9999/");
        assert_eq!(
            client.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-test:generateContent"
        );
    }
}
