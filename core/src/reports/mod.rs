pub mod storage;

use crate::classify::ClassificationResult;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use storage::{ReportStore, StorageError, StoredUpload};

pub const TICKET_PREFIX: &str = "CS-";

/// Reports at or above either threshold count as critical on the dashboard.
const CRITICAL_PRIORITY: u8 = 7;
const CRITICAL_SEVERITY: u8 = 80;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportStatus {
    #[default]
    Submitted,
    Verified,
    Dispatched,
    Resolved,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 4] = [
        ReportStatus::Submitted,
        ReportStatus::Verified,
        ReportStatus::Dispatched,
        ReportStatus::Resolved,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Submitted => "Submitted",
            ReportStatus::Verified => "Verified",
            ReportStatus::Dispatched => "Dispatched",
            ReportStatus::Resolved => "Resolved",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                format!("Unknown status '{wanted}': expected Submitted, Verified, Dispatched or Resolved")
            })
    }
}

/// Citizen-supplied fields of a report, before classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewReport {
    pub description: String,
    pub image_url: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub ticket_id: String,
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub email: String,
    pub status: ReportStatus,
    pub category: String,
    pub priority_level: u8,
    pub severity_score: u8,
    pub department: String,
    pub risk_assessment: String,
    pub expected_response_time: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented on every write; used for optimistic concurrency.
    #[serde(default)]
    pub version: u64,
}

impl Report {
    pub fn new(
        ticket_id: String,
        new: NewReport,
        classification: ClassificationResult,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            ticket_id,
            description: new.description,
            image_url: new.image_url,
            latitude: new.latitude,
            longitude: new.longitude,
            email: new.email,
            status: ReportStatus::Submitted,
            category: classification.category,
            priority_level: classification.priority,
            severity_score: classification.severity_score,
            department: classification.department,
            risk_assessment: classification.risk_message,
            expected_response_time: classification.expected_response_time,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn classification(&self) -> ClassificationResult {
        ClassificationResult {
            category: self.category.clone(),
            priority: self.priority_level,
            risk_message: self.risk_assessment.clone(),
            expected_response_time: self.expected_response_time.clone(),
            department: self.department.clone(),
            severity_score: self.severity_score,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.priority_level >= CRITICAL_PRIORITY || self.severity_score >= CRITICAL_SEVERITY
    }

    /// Case-insensitive substring match over ticket, category, description and email.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        [
            &self.ticket_id,
            &self.category,
            &self.description,
            &self.email,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&term))
    }
}

/// Canonical form of a user-typed ticket id.
pub fn normalize_ticket_id(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Format a ticket id from a random number; always five digits.
pub(crate) fn ticket_from_random(random: u32) -> String {
    format!("{TICKET_PREFIX}{}", 10_000 + random % 90_000)
}

/// Triage order: most urgent first, newest first within a priority.
pub fn sort_for_triage(reports: &mut [Report]) {
    reports.sort_by(|a, b| {
        b.priority_level
            .cmp(&a.priority_level)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total: usize,
    pub critical: usize,
    pub resolved_today: usize,
}

impl DashboardMetrics {
    pub fn compute(reports: &[Report], today: NaiveDate) -> Self {
        Self {
            total: reports.len(),
            critical: reports.iter().filter(|r| r.is_critical()).count(),
            resolved_today: reports
                .iter()
                .filter(|r| {
                    r.status == ReportStatus::Resolved && r.updated_at.date_naive() == today
                })
                .count(),
        }
    }
}
