use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Job;
use crate::db::types::{JobKind, JobState};

const COLUMNS: &str = "\
    id, kind, payload, state, progress, status_message, result, error, requested_by, \
    dedupe_key, created_at, started_at, finished_at";

const CLAIMED_COLUMNS: &str = "\
    jobs.id, jobs.kind, jobs.payload, jobs.state, jobs.progress, jobs.status_message, \
    jobs.result, jobs.error, jobs.requested_by, jobs.dedupe_key, jobs.created_at, \
    jobs.started_at, jobs.finished_at";

pub(crate) struct EnqueueJob<'a> {
    pub(crate) id: &'a str,
    pub(crate) kind: JobKind,
    pub(crate) payload: Value,
    pub(crate) requested_by: Option<&'a str>,
    pub(crate) dedupe_key: Option<&'a str>,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Inserts a pending job. Returns `None` when `dedupe_key` was already used.
pub(crate) async fn enqueue(pool: &PgPool, params: EnqueueJob<'_>) -> Result<Option<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(&format!(
        "INSERT INTO jobs (id, kind, payload, state, progress, requested_by, dedupe_key, created_at)
         VALUES ($1, $2, $3, $4, 0, $5, $6, $7)
         ON CONFLICT (dedupe_key) DO NOTHING
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.kind)
    .bind(Json(params.payload))
    .bind(JobState::Pending)
    .bind(params.requested_by)
    .bind(params.dedupe_key)
    .bind(params.created_at)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(&format!("SELECT {COLUMNS} FROM jobs WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Moves the oldest pending job to `progress`. Safe across concurrent workers.
pub(crate) async fn claim_next(
    pool: &PgPool,
    now: PrimitiveDateTime,
) -> Result<Option<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(&format!(
        "WITH candidate AS (
            SELECT id
            FROM jobs
            WHERE state = $1
            ORDER BY created_at, id
            FOR UPDATE SKIP LOCKED
            LIMIT 1
        )
        UPDATE jobs
        SET state = $2,
            started_at = $3,
            progress = 0,
            status_message = NULL
        FROM candidate
        WHERE jobs.id = candidate.id
        RETURNING {CLAIMED_COLUMNS}"
    ))
    .bind(JobState::Pending)
    .bind(JobState::Progress)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn update_progress(
    pool: &PgPool,
    id: &str,
    progress: i32,
    message: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE jobs SET progress = $1, status_message = $2 WHERE id = $3 AND state = $4",
    )
    .bind(progress.clamp(0, 100))
    .bind(message)
    .bind(id)
    .bind(JobState::Progress)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn mark_success(
    pool: &PgPool,
    id: &str,
    result: Value,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE jobs
         SET state = $1, progress = 100, result = $2, error = NULL,
             status_message = NULL, finished_at = $3
         WHERE id = $4",
    )
    .bind(JobState::Success)
    .bind(Json(result))
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn mark_failure(
    pool: &PgPool,
    id: &str,
    error: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE jobs
         SET state = $1, error = $2, status_message = NULL, finished_at = $3
         WHERE id = $4",
    )
    .bind(JobState::Failure)
    .bind(error)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Fails jobs stuck in `progress` since before `started_before`.
pub(crate) async fn fail_stale(
    pool: &PgPool,
    started_before: PrimitiveDateTime,
    now: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE jobs
         SET state = $1, error = 'worker lost', finished_at = $2
         WHERE state = $3 AND started_at < $4",
    )
    .bind(JobState::Failure)
    .bind(now)
    .bind(JobState::Progress)
    .bind(started_before)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn delete_finished_before(
    pool: &PgPool,
    before: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM jobs WHERE state IN ($1, $2) AND finished_at < $3",
    )
    .bind(JobState::Success)
    .bind(JobState::Failure)
    .bind(before)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Requester of the successful export job that produced `filename`.
pub(crate) async fn export_owner(
    pool: &PgPool,
    filename: &str,
) -> Result<Option<Option<String>>, sqlx::Error> {
    sqlx::query_scalar::<_, Option<String>>(
        "SELECT requested_by FROM jobs
         WHERE state = $1 AND result ->> 'filename' = $2
         ORDER BY finished_at DESC
         LIMIT 1",
    )
    .bind(JobState::Success)
    .bind(filename)
    .fetch_optional(pool)
    .await
}
