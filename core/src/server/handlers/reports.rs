use crate::classify::{classify, ClassificationResult, RawAnalysis};
use crate::error::AppError;
use crate::reports::{DashboardMetrics, NewReport, Report, ReportStatus};
use crate::server::error::ApiError;
use crate::server::extractors::{AdminSession, JsonBody, Session};
use crate::server::state::SharedState;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub(in crate::server) struct LookupQuery {
    ticket_id: Option<String>,
}

#[derive(Serialize)]
pub(in crate::server) struct ReportResponse {
    ok: bool,
    report: Report,
}

/// GET /api/reports?ticket_id=CS-12345
pub async fn lookup(
    State(state): State<SharedState>,
    Session(_): Session,
    Query(query): Query<LookupQuery>,
) -> Result<Json<ReportResponse>, ApiError> {
    let ticket = query.ticket_id.unwrap_or_default();
    if ticket.trim().is_empty() {
        return Err(ApiError::BadRequest("ticket_id is required".to_owned()));
    }
    let report = state.store.get(&ticket).map_err(AppError::from)?;
    Ok(Json(ReportResponse { ok: true, report }))
}

#[derive(Deserialize)]
pub(in crate::server) struct SubmitRequest {
    #[serde(default)]
    description: String,
    #[serde(default, alias = "imageUrl")]
    image_url: String,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    email: Option<String>,
    /// A classification the citizen already reviewed in the form; gaps are
    /// filled the same way as for model output.
    #[serde(default)]
    ai: Option<RawAnalysis>,
}

#[derive(Serialize)]
pub(in crate::server) struct SubmitResponse {
    ok: bool,
    report: Report,
    ai: ClassificationResult,
}

/// POST /api/reports
pub async fn submit(
    State(state): State<SharedState>,
    Session(session): Session,
    JsonBody(request): JsonBody<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let description = request.description.trim().to_owned();
    if description.is_empty() {
        return Err(ApiError::BadRequest("Description is required".to_owned()));
    }

    let ai = match request.ai {
        Some(raw) => raw.into_result(&description),
        None => classify(&description),
    };
    let email = request
        .email
        .filter(|e| !e.trim().is_empty())
        .unwrap_or(session.email)
        .trim()
        .to_lowercase();

    let new = NewReport {
        description,
        image_url: request.image_url.trim().to_owned(),
        latitude: request.latitude,
        longitude: request.longitude,
        email,
    };
    let report = state
        .store
        .insert(new, ai.clone())
        .map_err(AppError::from)?;
    info!(
        "Report {} filed: {} (priority {})",
        report.ticket_id, report.category, report.priority_level
    );

    Ok(Json(SubmitResponse {
        ok: true,
        report,
        ai,
    }))
}

#[derive(Deserialize)]
pub(in crate::server) struct AdminListQuery {
    #[serde(default)]
    q: Option<String>,
}

#[derive(Serialize)]
pub(in crate::server) struct AdminListResponse {
    ok: bool,
    reports: Vec<Report>,
    metrics: DashboardMetrics,
}

/// GET /api/admin/reports?q=term
///
/// Metrics always cover every report; the search term filters the list only.
pub async fn admin_list(
    State(state): State<SharedState>,
    AdminSession(_): AdminSession,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<AdminListResponse>, ApiError> {
    let all = state.store.list().map_err(AppError::from)?;
    let metrics = DashboardMetrics::compute(&all, Utc::now().date_naive());

    let term = query.q.unwrap_or_default();
    let reports = all
        .into_iter()
        .filter(|r| r.matches_search(&term))
        .collect();

    Ok(Json(AdminListResponse {
        ok: true,
        reports,
        metrics,
    }))
}

#[derive(Deserialize)]
pub(in crate::server) struct StatusUpdate {
    status: String,
    #[serde(default)]
    version: Option<u64>,
}

/// PATCH /api/admin/reports/{ticket}/status
pub async fn update_status(
    State(state): State<SharedState>,
    AdminSession(admin): AdminSession,
    Path(ticket): Path<String>,
    JsonBody(update): JsonBody<StatusUpdate>,
) -> Result<Json<ReportResponse>, ApiError> {
    let status: ReportStatus = update.status.parse().map_err(ApiError::BadRequest)?;
    let report = state
        .store
        .update_status(&ticket, status, update.version)
        .map_err(AppError::from)?;
    info!(
        "{} set {} to {}",
        admin.email, report.ticket_id, report.status
    );
    Ok(Json(ReportResponse { ok: true, report }))
}
