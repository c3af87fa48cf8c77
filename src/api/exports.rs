use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::jobs::accepted;
use crate::core::state::AppState;
use crate::db::types::JobKind;
use crate::repositories;
use crate::schemas::JobAccepted;
use crate::services::exports;
use crate::tasks::jobs;

const FILE_MISSING: &str = "File not found";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/user-csv", post(export_user_csv))
        .route("/admin-csv", post(export_admin_csv))
        .route("/download/:filename", get(download))
}

/// Queues a CSV of the caller's own quiz history.
async fn export_user_csv(
    CurrentUser { user, .. }: CurrentUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<JobAccepted>), ApiError> {
    let job = jobs::enqueue(
        state.db(),
        JobKind::ExportUserCsv,
        json!({ "user_id": user.id }),
        Some(&user.id),
        None,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to queue export"))?;

    accepted(job, "CSV export started. You will receive an email when it is ready.")
}

async fn export_admin_csv(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<JobAccepted>), ApiError> {
    let job = jobs::enqueue(state.db(), JobKind::ExportAdminCsv, json!({}), Some(&admin.id), None)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to queue export"))?;

    accepted(job, "Admin CSV export started. You will receive an email when it is ready.")
}

/// Serves a finished export to the user who requested it, or to any admin.
async fn download(
    CurrentUser { user, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    if !exports::is_safe_filename(&filename) {
        return Err(ApiError::BadRequest("Invalid filename".to_string()));
    }

    let owner = repositories::jobs::export_owner(state.db(), &filename)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to look up export"))?
        .ok_or_else(|| ApiError::NotFound(FILE_MISSING.to_string()))?;
    if owner.as_deref() != Some(user.id.as_str()) && !user.is_admin() {
        return Err(ApiError::Forbidden("Access denied"));
    }

    let path = state.settings().exports().dir.join(&filename);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound(FILE_MISSING.to_string()));
        }
        Err(err) => return Err(ApiError::internal(err, "Failed to read export file")),
    };

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(|e| ApiError::internal(e, "Invalid download header"))?;
    let mut response = (StatusCode::OK, bytes).into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8"));
    response.headers_mut().insert(header::CONTENT_DISPOSITION, disposition);
    Ok(response)
}

#[cfg(test)]
mod tests;
