use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::{Date, PrimitiveDateTime};

use crate::db::types::{JobKind, JobState, ADMIN_ROLE};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) password_hash: String,
    pub(crate) full_name: String,
    pub(crate) qualification: Option<String>,
    pub(crate) date_of_birth: Option<Date>,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) roles: Vec<String>,
}

impl User {
    pub(crate) fn is_admin(&self) -> bool {
        self.roles.iter().any(|role| role == ADMIN_ROLE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Role {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Subject {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) chapters_count: i64,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Chapter {
    pub(crate) id: String,
    pub(crate) subject_id: String,
    pub(crate) subject_name: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) quizzes_count: i64,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Quiz {
    pub(crate) id: String,
    pub(crate) chapter_id: String,
    pub(crate) chapter_name: String,
    pub(crate) subject_id: String,
    pub(crate) subject_name: String,
    pub(crate) title: String,
    pub(crate) date_of_quiz: Date,
    pub(crate) time_duration: String,
    pub(crate) remarks: String,
    pub(crate) is_active: bool,
    pub(crate) question_count: i64,
    pub(crate) total_marks: i64,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) quiz_title: String,
    pub(crate) question_statement: String,
    pub(crate) option1: String,
    pub(crate) option2: String,
    pub(crate) option3: Option<String>,
    pub(crate) option4: Option<String>,
    pub(crate) correct_option: i32,
    pub(crate) marks: i32,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// A stored attempt joined with the quiz's current total marks.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Score {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) user_name: String,
    pub(crate) quiz_id: String,
    pub(crate) quiz_title: String,
    pub(crate) time_stamp_of_attempt: PrimitiveDateTime,
    pub(crate) total_scored: i32,
    pub(crate) total_questions: i32,
    pub(crate) time_taken: String,
    pub(crate) total_marks: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Job {
    pub(crate) id: String,
    pub(crate) kind: JobKind,
    pub(crate) payload: Json<serde_json::Value>,
    pub(crate) state: JobState,
    pub(crate) progress: i32,
    pub(crate) status_message: Option<String>,
    pub(crate) result: Option<Json<serde_json::Value>>,
    pub(crate) error: Option<String>,
    pub(crate) requested_by: Option<String>,
    pub(crate) dedupe_key: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) started_at: Option<PrimitiveDateTime>,
    pub(crate) finished_at: Option<PrimitiveDateTime>,
}
