use std::path::{Path, PathBuf};
use std::time::SystemTime;

use sha2::{Digest, Sha256};
use thiserror::Error;
use time::macros::format_description;
use time::PrimitiveDateTime;

use crate::core::time::{format_date, format_primitive};
use crate::repositories::reports::{UserExportRow, UserSummaryRow};
use crate::services::scoring::{percentage, round2};

pub(crate) const USER_HEADERS: [&str; 11] = [
    "quiz_id",
    "quiz_title",
    "subject",
    "chapter",
    "date_of_quiz",
    "attempted_at",
    "score",
    "total_marks",
    "percentage",
    "time_taken",
    "remarks",
];

pub(crate) const ADMIN_HEADERS: [&str; 8] = [
    "user_id",
    "username",
    "email",
    "full_name",
    "quizzes_taken",
    "average_score",
    "average_percentage",
    "last_attempt",
];

#[derive(Debug, Error)]
pub(crate) enum ExportError {
    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("export io failed: {0}")]
    Io(#[from] std::io::Error),
}

pub(crate) fn render_user_csv(rows: &[UserExportRow]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(USER_HEADERS)?;

    for row in rows {
        writer.write_record([
            row.quiz_id.clone(),
            row.quiz_title.clone(),
            row.subject.clone(),
            row.chapter.clone(),
            format_date(row.date_of_quiz),
            format_primitive(row.attempted_at),
            row.score.to_string(),
            row.total_marks.to_string(),
            format!("{:.2}", percentage(row.score as i64, row.total_marks)),
            row.time_taken.clone(),
            row.remarks.clone(),
        ])?;
    }

    finish(writer)
}

pub(crate) fn render_admin_csv(rows: &[UserSummaryRow]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(ADMIN_HEADERS)?;

    for row in rows {
        writer.write_record([
            row.user_id.clone(),
            row.username.clone(),
            row.email.clone(),
            row.full_name.clone(),
            row.quizzes_taken.to_string(),
            format!("{:.2}", round2(row.average_score)),
            format!("{:.2}", round2(row.average_percentage)),
            row.last_attempt.map(format_primitive).unwrap_or_default(),
        ])?;
    }

    finish(writer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, ExportError> {
    writer.into_inner().map_err(|err| ExportError::Io(err.into_error()))
}

fn stamp(now: PrimitiveDateTime) -> String {
    now.format(format_description!("[year][month][day]_[hour][minute][second]"))
        .unwrap_or_else(|_| now.assume_utc().unix_timestamp().to_string())
}

/// First block of the job id; keeps same-second exports apart.
fn job_tag(job_id: &str) -> String {
    job_id.chars().filter(char::is_ascii_alphanumeric).take(8).collect()
}

pub(crate) fn user_export_filename(user_id: &str, job_id: &str, now: PrimitiveDateTime) -> String {
    format!("quiz_history_{}_{}_{}.csv", user_id, stamp(now), job_tag(job_id))
}

pub(crate) fn admin_export_filename(job_id: &str, now: PrimitiveDateTime) -> String {
    format!("users_summary_{}_{}.csv", stamp(now), job_tag(job_id))
}

/// Accepts only names this module generates: no separators, no leading dot.
pub(crate) fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name.ends_with(".csv")
        && name.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'))
}

pub(crate) fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub(crate) async fn write_export(
    dir: &Path,
    filename: &str,
    bytes: &[u8],
) -> Result<PathBuf, ExportError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(filename);
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

/// Deletes export files last modified before `cutoff`. Returns how many were removed.
pub(crate) async fn remove_older_than(dir: &Path, cutoff: SystemTime) -> Result<u64, ExportError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(err.into()),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if !is_safe_filename(&name.to_string_lossy()) {
            continue;
        }

        let metadata = entry.metadata().await?;
        if metadata.is_file() && metadata.modified()? < cutoff {
            tokio::fs::remove_file(entry.path()).await?;
            removed += 1;
        }
    }

    Ok(removed)
}
