use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::time::format_primitive;
use crate::db::models::Score;
use crate::schemas::trimmed;
use crate::services::scoring;

/// Answers map question ids to the chosen option. Values stay raw JSON so a
/// bad option is reported as a validation error rather than a parse error.
#[derive(Debug, Deserialize)]
pub(crate) struct ScoreSubmit {
    #[serde(default, deserialize_with = "trimmed")]
    pub(crate) quiz_id: String,
    #[serde(default)]
    pub(crate) answers: HashMap<String, Value>,
    #[serde(default, deserialize_with = "trimmed")]
    pub(crate) time_taken: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ScoreListQuery {
    #[serde(default)]
    pub(crate) quiz_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ScoreResponse {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) quiz_title: String,
    pub(crate) user_id: String,
    pub(crate) user_name: String,
    pub(crate) time_stamp_of_attempt: String,
    pub(crate) total_scored: i32,
    pub(crate) total_questions: i32,
    pub(crate) total_marks: i64,
    pub(crate) percentage: f64,
    pub(crate) time_taken: String,
}

impl ScoreResponse {
    pub(crate) fn from_db(score: Score) -> Self {
        Self {
            percentage: scoring::percentage(score.total_scored as i64, score.total_marks),
            id: score.id,
            quiz_id: score.quiz_id,
            quiz_title: score.quiz_title,
            user_id: score.user_id,
            user_name: score.user_name,
            time_stamp_of_attempt: format_primitive(score.time_stamp_of_attempt),
            total_scored: score.total_scored,
            total_questions: score.total_questions,
            total_marks: score.total_marks,
            time_taken: score.time_taken,
        }
    }
}
