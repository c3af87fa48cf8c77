use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::core::state::AppState;
use crate::db::models::Job;
use crate::db::types::JobKind;
use crate::repositories;
use crate::schemas::job::JobResponse;
use crate::schemas::JobAccepted;
use crate::tasks::jobs;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/daily-reminders", post(trigger_daily_reminders))
        .route("/monthly-reports", post(trigger_monthly_reports))
        .route("/:id", get(job_status))
}

/// `202 Accepted` for a freshly queued job.
pub(crate) fn accepted(
    job: Option<Job>,
    message: &str,
) -> Result<(StatusCode, Json<JobAccepted>), ApiError> {
    let job = job.ok_or_else(|| ApiError::Conflict("Job is already queued".to_string()))?;
    Ok((
        StatusCode::ACCEPTED,
        Json(JobAccepted { message: message.to_string(), job_id: job.id, status: "PENDING" }),
    ))
}

async fn trigger_daily_reminders(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<JobAccepted>), ApiError> {
    let job = jobs::enqueue(state.db(), JobKind::DailyReminders, json!({}), Some(&admin.id), None)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to queue job"))?;
    accepted(job, "Daily reminders job started")
}

async fn trigger_monthly_reports(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<JobAccepted>), ApiError> {
    let job = jobs::enqueue(state.db(), JobKind::MonthlyReports, json!({}), Some(&admin.id), None)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to queue job"))?;
    accepted(job, "Monthly reports job started")
}

async fn job_status(
    CurrentUser { user, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = repositories::jobs::find_by_id(state.db(), &id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load job"))?
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))?;

    if job.requested_by.as_deref() != Some(user.id.as_str()) && !user.is_admin() {
        return Err(ApiError::Forbidden("Access denied"));
    }
    Ok(Json(JobResponse::from_db(job)))
}
