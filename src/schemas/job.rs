use serde::Serialize;

use crate::core::time::format_primitive;
use crate::db::models::Job;
use crate::db::types::{JobKind, JobState};

#[derive(Debug, Serialize)]
pub(crate) struct JobResponse {
    pub(crate) id: String,
    pub(crate) kind: JobKind,
    pub(crate) state: JobState,
    pub(crate) progress: i32,
    pub(crate) status: String,
    pub(crate) result: Option<serde_json::Value>,
    pub(crate) error: Option<String>,
    pub(crate) created_at: String,
    pub(crate) started_at: Option<String>,
    pub(crate) finished_at: Option<String>,
}

impl JobResponse {
    pub(crate) fn from_db(job: Job) -> Self {
        let status = job.status_message.clone().unwrap_or_else(|| default_status(job.state));
        Self {
            id: job.id,
            kind: job.kind,
            state: job.state,
            progress: job.progress,
            status,
            result: job.result.map(|result| result.0),
            error: job.error,
            created_at: format_primitive(job.created_at),
            started_at: job.started_at.map(format_primitive),
            finished_at: job.finished_at.map(format_primitive),
        }
    }
}

fn default_status(state: JobState) -> String {
    match state {
        JobState::Pending => "Job is waiting to be processed",
        JobState::Progress => "Job is running",
        JobState::Success => "Job completed successfully",
        JobState::Failure => "Job failed",
    }
    .to_string()
}
