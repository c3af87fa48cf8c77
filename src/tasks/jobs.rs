//! Job bodies and the run wrapper that records their terminal state.

use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use serde_json::{json, Value};
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::core::state::AppState;
use crate::core::time::{month_label, primitive_now_utc};
use crate::db::models::Job;
use crate::db::types::{JobKind, JobState};
use crate::repositories::{jobs, quizzes, reports, scores, users};
use crate::services::exports;
use crate::services::notifier::Attachment;
use crate::services::reporting;

const TIME_LIMIT_EXCEEDED: &str = "time limit exceeded";

/// Inserts a pending job. `None` means the dedupe key was already taken.
pub(crate) async fn enqueue(
    pool: &PgPool,
    kind: JobKind,
    payload: Value,
    requested_by: Option<&str>,
    dedupe_key: Option<&str>,
) -> Result<Option<Job>, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let job = jobs::enqueue(
        pool,
        jobs::EnqueueJob {
            id: &id,
            kind,
            payload,
            requested_by,
            dedupe_key,
            created_at: primitive_now_utc(),
        },
    )
    .await?;

    if job.is_some() {
        tracing::info!(job_id = %id, kind = kind.as_str(), "Job enqueued");
    }
    Ok(job)
}

/// Runs a claimed job under the configured time limit and stores the outcome.
pub(crate) async fn execute(state: &AppState, job: Job) {
    let limit = state.settings().jobs().time_limit();
    let started = std::time::Instant::now();
    tracing::info!(job_id = %job.id, kind = job.kind.as_str(), "Job started");

    let outcome = match tokio::time::timeout(limit, dispatch(state, &job)).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(err)) => Err(format!("{err:#}")),
        Err(_) => Err(TIME_LIMIT_EXCEEDED.to_string()),
    };

    let now = primitive_now_utc();
    let (state_label, stored) = match outcome {
        Ok(result) => {
            (JobState::Success, jobs::mark_success(state.db(), &job.id, result, now).await)
        }
        Err(message) => {
            tracing::error!(job_id = %job.id, kind = job.kind.as_str(), error = %message, "Job failed");
            (JobState::Failure, jobs::mark_failure(state.db(), &job.id, &message, now).await)
        }
    };

    if let Err(err) = stored {
        tracing::error!(job_id = %job.id, error = %err, "Failed to record job outcome");
    }

    metrics::counter!(
        "jobs_total",
        "kind" => job.kind.as_str(),
        "status" => state_label.as_str()
    )
    .increment(1);
    tracing::info!(
        job_id = %job.id,
        kind = job.kind.as_str(),
        state = state_label.as_str(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Job finished"
    );
}

async fn dispatch(state: &AppState, job: &Job) -> Result<Value> {
    match job.kind {
        JobKind::DailyReminders => daily_reminders(state).await,
        JobKind::MonthlyReports => monthly_reports(state).await,
        JobKind::ExportUserCsv => export_user_csv(state, job).await,
        JobKind::ExportAdminCsv => export_admin_csv(state, job).await,
        JobKind::Cleanup => cleanup(state).await,
    }
}

async fn report_progress(state: &AppState, job: &Job, progress: i32, message: &str) {
    if let Err(err) = jobs::update_progress(state.db(), &job.id, progress, message).await {
        tracing::warn!(job_id = %job.id, error = %err, "Failed to update job progress");
    }
}

async fn daily_reminders(state: &AppState) -> Result<Value> {
    let students =
        users::list_active_students(state.db()).await.context("Failed to load students")?;
    let now = primitive_now_utc();
    let app_url = &state.settings().api().app_base_url;
    let mut sent = 0;

    for user in &students {
        let last_attempt = scores::last_attempt_at(state.db(), &user.id)
            .await
            .context("Failed to load last attempt")?;
        let new_quizzes = match last_attempt {
            Some(since) => quizzes::active_titles_created_after(state.db(), Some(since))
                .await
                .context("Failed to load new quizzes")?
                .len(),
            None => 0,
        };

        let Some(reason) = reporting::reminder_reason(last_attempt, new_quizzes, now) else {
            continue;
        };

        let html = reporting::reminder_email(&user.full_name, &reason, app_url);
        match state
            .notifier()
            .send_email(&user.email, "Quiz Master - Daily Reminder", &html, None)
            .await
        {
            Ok(true) => sent += 1,
            Ok(false) => {}
            Err(err) => tracing::warn!(user_id = %user.id, error = %err, "Reminder email failed"),
        }

        let text = reporting::reminder_chat(&user.full_name, &reason);
        if let Err(err) = state.notifier().send_chat(&text).await {
            tracing::warn!(user_id = %user.id, error = %err, "Reminder chat message failed");
        }
    }

    tracing::info!(reminders_sent = sent, users_checked = students.len(), "Daily reminders done");
    Ok(json!({ "reminders_sent": sent, "users_checked": students.len() }))
}

async fn monthly_reports(state: &AppState) -> Result<Value> {
    let (start, end) = reporting::previous_month_window(primitive_now_utc());
    let month = month_label(start);

    let attempts = reports::attempts_between(state.db(), start, end)
        .await
        .context("Failed to load monthly attempts")?;
    let built = reporting::build_monthly_reports(&attempts);
    let students =
        users::list_active_students(state.db()).await.context("Failed to load students")?;
    let app_url = &state.settings().api().app_base_url;
    let subject = format!("Quiz Master - Monthly Report for {month}");
    let mut sent = 0;

    for user in students {
        let Some(report) = built.get(&user.id) else {
            continue;
        };

        let html = reporting::render_monthly_report(&user.full_name, &month, report, app_url);
        match state.notifier().send_email(&user.email, &subject, &html, None).await {
            Ok(true) => sent += 1,
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(user_id = %user.id, error = %err, "Monthly report email failed")
            }
        }
    }

    Ok(json!({ "reports_sent": sent, "month": month }))
}

fn download_url(state: &AppState, filename: &str) -> String {
    let api = state.settings().api();
    format!(
        "{}{}/export/download/{}",
        api.app_base_url.trim_end_matches('/'),
        api.api_prefix,
        filename
    )
}

struct ExportFile {
    filename: String,
    bytes: Vec<u8>,
    rows: usize,
}

async fn finish_export(state: &AppState, job: &Job, file: ExportFile, notify: Option<&str>) -> Result<Value> {
    report_progress(state, job, 80, "Writing file").await;
    exports::write_export(&state.settings().exports().dir, &file.filename, &file.bytes)
        .await
        .context("Failed to write export file")?;

    let url = download_url(state, &file.filename);
    if let Some(email) = notify {
        let attachment = Attachment {
            filename: file.filename.clone(),
            content_type: "text/csv",
            bytes: file.bytes.clone(),
        };
        let html = format!(
            "<html><body><p>Your CSV export is ready ({} rows).</p>\
             <p><a href=\"{url}\">Download</a></p></body></html>",
            file.rows
        );
        if let Err(err) = state
            .notifier()
            .send_email(email, "Quiz Master - Export Ready", &html, Some(&attachment))
            .await
        {
            tracing::warn!(job_id = %job.id, error = %err, "Export notification failed");
        }
    }

    Ok(json!({
        "filename": file.filename,
        "rows": file.rows,
        "download_url": url,
        "sha256": exports::checksum(&file.bytes),
    }))
}

async fn requester_email(state: &AppState, job: &Job) -> Result<Option<String>> {
    let Some(user_id) = job.requested_by.as_deref() else {
        return Ok(None);
    };
    let user = users::find_by_id(state.db(), user_id).await.context("Failed to load requester")?;
    Ok(user.map(|user| user.email))
}

async fn export_user_csv(state: &AppState, job: &Job) -> Result<Value> {
    let user_id = job
        .payload
        .0
        .get("user_id")
        .and_then(Value::as_str)
        .context("Export payload is missing user_id")?
        .to_string();

    report_progress(state, job, 10, "Loading quiz history").await;
    let rows =
        reports::user_export_rows(state.db(), &user_id).await.context("Failed to load scores")?;

    report_progress(state, job, 50, "Rendering CSV").await;
    let file = ExportFile {
        filename: exports::user_export_filename(&user_id, &job.id, primitive_now_utc()),
        bytes: exports::render_user_csv(&rows)?,
        rows: rows.len(),
    };

    let email = requester_email(state, job).await?;
    finish_export(state, job, file, email.as_deref()).await
}

async fn export_admin_csv(state: &AppState, job: &Job) -> Result<Value> {
    report_progress(state, job, 10, "Loading users").await;
    let rows = reports::user_summary_rows(state.db()).await.context("Failed to load users")?;

    report_progress(state, job, 50, "Rendering CSV").await;
    let file = ExportFile {
        filename: exports::admin_export_filename(&job.id, primitive_now_utc()),
        bytes: exports::render_admin_csv(&rows)?,
        rows: rows.len(),
    };

    let email = requester_email(state, job).await?;
    finish_export(state, job, file, email.as_deref()).await
}

fn days_before(now: PrimitiveDateTime, days: u64) -> PrimitiveDateTime {
    now.saturating_sub(time::Duration::days(days as i64))
}

async fn cleanup(state: &AppState) -> Result<Value> {
    let settings = state.settings();
    let now = primitive_now_utc();

    let retention = Duration::from_secs(settings.exports().retention_days * 24 * 60 * 60);
    let cutoff = SystemTime::now().checked_sub(retention).unwrap_or(SystemTime::UNIX_EPOCH);
    let files_removed = exports::remove_older_than(&settings.exports().dir, cutoff)
        .await
        .context("Failed to remove old exports")?;

    let jobs_removed =
        jobs::delete_finished_before(state.db(), days_before(now, settings.jobs().finished_retention_days))
            .await
            .context("Failed to delete finished jobs")?;

    let stale_after = time::Duration::seconds((settings.jobs().time_limit_seconds * 2) as i64);
    let stale_failed = jobs::fail_stale(state.db(), now.saturating_sub(stale_after), now)
        .await
        .context("Failed to fail stale jobs")?;

    tracing::info!(files_removed, jobs_removed, stale_failed, "Cleanup done");
    Ok(json!({
        "files_removed": files_removed,
        "jobs_removed": jobs_removed,
        "stale_jobs_failed": stale_failed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn dedupe_key_blocks_a_second_enqueue() {
        let Some(ctx) = test_support::setup_test_context().await else {
            return;
        };
        let pool = ctx.state.db();

        let first = enqueue(pool, JobKind::Cleanup, json!({}), None, Some("cleanup:slot"))
            .await
            .unwrap();
        let second = enqueue(pool, JobKind::Cleanup, json!({}), None, Some("cleanup:slot"))
            .await
            .unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn claimed_export_job_succeeds_with_file() {
        let Some(ctx) = test_support::setup_test_context().await else {
            return;
        };
        let student = test_support::insert_user(&ctx.state, "amy", "amy@test.io").await;

        let job = enqueue(
            ctx.state.db(),
            JobKind::ExportUserCsv,
            json!({ "user_id": student.id }),
            Some(&student.id),
            None,
        )
        .await
        .unwrap()
        .unwrap();

        let claimed = jobs::claim_next(ctx.state.db(), primitive_now_utc()).await.unwrap().unwrap();
        assert_eq!(claimed.id, job.id);
        assert_eq!(claimed.state, JobState::Progress);
        assert!(jobs::claim_next(ctx.state.db(), primitive_now_utc()).await.unwrap().is_none());

        execute(&ctx.state, claimed).await;

        let done = jobs::find_by_id(ctx.state.db(), &job.id).await.unwrap().unwrap();
        assert_eq!(done.state, JobState::Success);
        assert_eq!(done.progress, 100);
        let result = done.result.expect("result").0;
        assert_eq!(result["rows"], 0);

        let filename = result["filename"].as_str().unwrap();
        let path = ctx.state.settings().exports().dir.join(filename);
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(content.starts_with("quiz_id,quiz_title"));
        assert_eq!(
            jobs::export_owner(ctx.state.db(), filename).await.unwrap(),
            Some(Some(student.id.clone()))
        );
    }

    #[tokio::test]
    async fn export_without_user_fails_terminally() {
        let Some(ctx) = test_support::setup_test_context().await else {
            return;
        };

        let job = enqueue(ctx.state.db(), JobKind::ExportUserCsv, json!({}), None, None)
            .await
            .unwrap()
            .unwrap();
        let claimed = jobs::claim_next(ctx.state.db(), primitive_now_utc()).await.unwrap().unwrap();
        execute(&ctx.state, claimed).await;

        let failed = jobs::find_by_id(ctx.state.db(), &job.id).await.unwrap().unwrap();
        assert_eq!(failed.state, JobState::Failure);
        assert!(failed.error.unwrap().contains("user_id"));
        assert!(failed.finished_at.is_some());
    }
}
