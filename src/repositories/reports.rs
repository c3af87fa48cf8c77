//! Row sources for monthly reports and CSV exports.

use sqlx::{FromRow, PgPool};
use time::{Date, PrimitiveDateTime};

use crate::repositories::dashboard::{PERCENT, QUIZ_MARKS_JOIN};

/// One attempt with the labels a report needs.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub(crate) struct AttemptDetail {
    pub(crate) user_id: String,
    pub(crate) quiz_title: String,
    pub(crate) subject: String,
    pub(crate) chapter: String,
    pub(crate) total_scored: i32,
    pub(crate) total_marks: i64,
    pub(crate) attempted_at: PrimitiveDateTime,
}

/// Every attempt made in `[start, end)`, oldest first.
pub(crate) async fn attempts_between(
    pool: &PgPool,
    start: PrimitiveDateTime,
    end: PrimitiveDateTime,
) -> Result<Vec<AttemptDetail>, sqlx::Error> {
    sqlx::query_as::<_, AttemptDetail>(&format!(
        "SELECT sc.user_id, q.title AS quiz_title, s.name AS subject, c.name AS chapter,
                sc.total_scored, COALESCE(qm.total_marks, 0)::BIGINT AS total_marks,
                sc.time_stamp_of_attempt AS attempted_at
         FROM scores sc
         JOIN quizzes q ON q.id = sc.quiz_id
         JOIN chapters c ON c.id = q.chapter_id
         JOIN subjects s ON s.id = c.subject_id
         {QUIZ_MARKS_JOIN}
         WHERE sc.time_stamp_of_attempt >= $1 AND sc.time_stamp_of_attempt < $2
         ORDER BY sc.time_stamp_of_attempt, sc.id"
    ))
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub(crate) struct UserExportRow {
    pub(crate) quiz_id: String,
    pub(crate) quiz_title: String,
    pub(crate) subject: String,
    pub(crate) chapter: String,
    pub(crate) date_of_quiz: Date,
    pub(crate) attempted_at: PrimitiveDateTime,
    pub(crate) score: i32,
    pub(crate) total_marks: i64,
    pub(crate) time_taken: String,
    pub(crate) remarks: String,
}

pub(crate) async fn user_export_rows(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<UserExportRow>, sqlx::Error> {
    sqlx::query_as::<_, UserExportRow>(&format!(
        "SELECT q.id AS quiz_id, q.title AS quiz_title, s.name AS subject, c.name AS chapter,
                q.date_of_quiz, sc.time_stamp_of_attempt AS attempted_at,
                sc.total_scored AS score, COALESCE(qm.total_marks, 0)::BIGINT AS total_marks,
                sc.time_taken, q.remarks
         FROM scores sc
         JOIN quizzes q ON q.id = sc.quiz_id
         JOIN chapters c ON c.id = q.chapter_id
         JOIN subjects s ON s.id = c.subject_id
         {QUIZ_MARKS_JOIN}
         WHERE sc.user_id = $1
         ORDER BY sc.time_stamp_of_attempt, sc.id"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub(crate) struct UserSummaryRow {
    pub(crate) user_id: String,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) quizzes_taken: i64,
    pub(crate) average_score: f64,
    pub(crate) average_percentage: f64,
    pub(crate) last_attempt: Option<PrimitiveDateTime>,
}

/// One summary row per user, including users without attempts.
pub(crate) async fn user_summary_rows(pool: &PgPool) -> Result<Vec<UserSummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, UserSummaryRow>(&format!(
        "SELECT u.id AS user_id, u.username, u.email, u.full_name,
                COUNT(sc.id) AS quizzes_taken,
                COALESCE(AVG(sc.total_scored), 0)::FLOAT8 AS average_score,
                COALESCE(AVG({PERCENT}) FILTER (WHERE sc.id IS NOT NULL), 0)::FLOAT8
                    AS average_percentage,
                MAX(sc.time_stamp_of_attempt) AS last_attempt
         FROM users u
         LEFT JOIN scores sc ON sc.user_id = u.id
         {QUIZ_MARKS_JOIN}
         GROUP BY u.id, u.username, u.email, u.full_name
         ORDER BY u.username"
    ))
    .fetch_all(pool)
    .await
}
