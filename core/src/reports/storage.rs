//! File-backed report storage.
//!
//! Layout:
//! ```text
//! <root>/
//!   reports/
//!     CS-12345.json          # Report
//!   uploads/
//!     reports/2024-05-01/<32-hex>.jpg
//! ```
//!
//! Writes go to a uniquely named temp file first. New reports are published
//! with a hard link, which fails if the ticket already exists; updates are
//! published with a rename.

use super::{
    normalize_ticket_id, sort_for_triage, ticket_from_random, NewReport, Report, ReportStatus,
};
use crate::classify::ClassificationResult;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use thiserror::Error;

/// How many random tickets to try before giving up on an insert.
const MAX_TICKET_ATTEMPTS: usize = 16;
const MAX_FILENAME_LEN: usize = 120;

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w.\-]+").unwrap());
static DASH_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").unwrap());

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Version conflict: expected version {expected}, found {found}. Another process modified the report.")]
    VersionConflict { expected: u64, found: u64 },
    #[error("Could not allocate a free ticket id after {0} attempts")]
    TicketsExhausted(usize),
    #[error("Random number generator failed: {0}")]
    Random(String),
    #[error("Path traversal: {0}")]
    PathTraversal(String),
}

/// Location of a stored upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUpload {
    pub path: String,
    pub public_url: String,
}

/// Clones share one update lock, so status changes made through the same
/// store are serialized. Separate processes on one directory are not.
#[derive(Debug, Clone)]
pub struct ReportStore {
    root: PathBuf,
    update_lock: Arc<Mutex<()>>,
}

fn random_bytes<const N: usize>() -> Result<[u8; N], StorageError> {
    let mut buf = [0u8; N];
    getrandom::getrandom(&mut buf).map_err(|e| StorageError::Random(e.to_string()))?;
    Ok(buf)
}

fn random_ticket() -> Result<String, StorageError> {
    Ok(ticket_from_random(u32::from_le_bytes(random_bytes::<4>()?)))
}

/// Ticket ids are used as file names, so only `[A-Z0-9-]` is accepted.
fn is_valid_ticket(ticket: &str) -> bool {
    !ticket.is_empty()
        && ticket
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
}

/// Make a client-supplied file name safe to embed in a storage key.
pub fn sanitize_filename(name: &str) -> String {
    let name = if name.trim().is_empty() { "upload" } else { name };
    let replaced = UNSAFE_FILENAME_CHARS.replace_all(name, "-");
    let collapsed = DASH_RUNS.replace_all(&replaced, "-");
    collapsed
        .trim_matches('-')
        .chars()
        .take(MAX_FILENAME_LEN)
        .collect()
}

/// Lower-cased alphanumeric extension of a sanitized name, or `bin`.
fn upload_extension(sanitized: &str) -> String {
    sanitized
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_owned())
}

/// Reject keys that could escape the uploads directory.
fn safe_relative_path(key: &str) -> Result<PathBuf, StorageError> {
    let path = Path::new(key);
    let all_normal = path
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if key.is_empty() || key.contains('\\') || !all_normal {
        return Err(StorageError::PathTraversal(key.to_owned()));
    }
    Ok(path.to_path_buf())
}

impl ReportStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(root.join("reports"))?;
        fs::create_dir_all(root.join("uploads"))?;
        Ok(Self {
            root,
            update_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn reports_dir(&self) -> PathBuf {
        self.root.join("reports")
    }

    fn uploads_dir(&self) -> PathBuf {
        self.root.join("uploads")
    }

    fn report_path(&self, ticket: &str) -> PathBuf {
        self.reports_dir().join(format!("{ticket}.json"))
    }

    /// Write `report` to a fresh temp file next to its final location.
    fn write_temp(&self, report: &Report) -> Result<PathBuf, StorageError> {
        let suffix = hex::encode(random_bytes::<8>()?);
        let tmp = self
            .reports_dir()
            .join(format!(".{}.{suffix}.tmp", report.ticket_id));
        let content = serde_json::to_string_pretty(report)?;
        fs::write(&tmp, content)?;
        Ok(tmp)
    }

    /// Persist a new report under a freshly generated ticket id.
    pub fn insert(
        &self,
        new: NewReport,
        classification: ClassificationResult,
    ) -> Result<Report, StorageError> {
        self.insert_with(new, classification, random_ticket)
    }

    /// Insert using tickets drawn from `next_ticket` until one is free.
    pub(crate) fn insert_with(
        &self,
        new: NewReport,
        classification: ClassificationResult,
        mut next_ticket: impl FnMut() -> Result<String, StorageError>,
    ) -> Result<Report, StorageError> {
        let now = Utc::now();
        let mut report = Report::new(String::new(), new, classification, now);

        for _ in 0..MAX_TICKET_ATTEMPTS {
            report.ticket_id = next_ticket()?;
            let tmp = self.write_temp(&report)?;
            let result = fs::hard_link(&tmp, self.report_path(&report.ticket_id));
            let _ = fs::remove_file(&tmp);
            match result {
                Ok(()) => {
                    debug!("Stored report {}", report.ticket_id);
                    return Ok(report);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!("Ticket {} taken, retrying", report.ticket_id);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StorageError::TicketsExhausted(MAX_TICKET_ATTEMPTS))
    }

    /// Look up a report by ticket id (case-insensitive, surrounding space ignored).
    pub fn get(&self, ticket: &str) -> Result<Report, StorageError> {
        let ticket = normalize_ticket_id(ticket);
        if !is_valid_ticket(&ticket) {
            return Err(StorageError::NotFound(ticket));
        }
        let path = self.report_path(&ticket);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StorageError::NotFound(ticket)),
            Err(e) => Err(e.into()),
        }
    }

    /// All stored reports in triage order. Unreadable files are skipped.
    pub fn list(&self) -> Result<Vec<Report>, StorageError> {
        let mut reports = Vec::new();

        for entry in fs::read_dir(self.reports_dir())? {
            let path = entry?.path();
            let is_report = path.extension().is_some_and(|ext| ext == "json")
                && !path
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with('.'));
            if !is_report {
                continue;
            }
            match fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str::<Report>(&content) {
                    Ok(report) => reports.push(report),
                    Err(e) => warn!("Failed to parse {}: {e}", path.display()),
                },
                Err(e) => warn!("Failed to read {}: {e}", path.display()),
            }
        }

        sort_for_triage(&mut reports);
        Ok(reports)
    }

    /// Change a report's status.
    ///
    /// When `expected_version` is given and differs from the stored version,
    /// the update is refused with [`StorageError::VersionConflict`].
    pub fn update_status(
        &self,
        ticket: &str,
        status: ReportStatus,
        expected_version: Option<u64>,
    ) -> Result<Report, StorageError> {
        // Held from the version check until the new file is in place.
        let _guard = self
            .update_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut report = self.get(ticket)?;
        if let Some(expected) = expected_version {
            if report.version != expected {
                return Err(StorageError::VersionConflict {
                    expected,
                    found: report.version,
                });
            }
        }

        report.status = status;
        report.updated_at = Utc::now();
        report.version += 1;

        let tmp = self.write_temp(&report)?;
        if let Err(e) = fs::rename(&tmp, self.report_path(&report.ticket_id)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        debug!(
            "Report {} is now {} (v{})",
            report.ticket_id, report.status, report.version
        );
        Ok(report)
    }

    /// Store an uploaded file under a dated, random key.
    pub fn save_upload(
        &self,
        filename: &str,
        bytes: &[u8],
        now: DateTime<Utc>,
    ) -> Result<StoredUpload, StorageError> {
        let ext = upload_extension(&sanitize_filename(filename));
        let name = hex::encode(random_bytes::<16>()?);
        let key = format!("reports/{}/{name}.{ext}", now.format("%Y-%m-%d"));

        let path = self.uploads_dir().join(&key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;

        Ok(StoredUpload {
            public_url: format!("/uploads/{key}"),
            path: key,
        })
    }

    /// Read back an upload by the key returned from [`ReportStore::save_upload`].
    pub fn read_upload(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let relative = safe_relative_path(key)?;
        match fs::read(self.uploads_dir().join(relative)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_owned()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
