//! Aggregation queries behind the dashboards.
//!
//! Percentages are always computed against the live marks sum of each quiz,
//! joined in through [`QUIZ_MARKS_JOIN`].

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::PrimitiveDateTime;

use crate::db::models::Score;
use crate::repositories::scores;

pub(crate) const QUIZ_MARKS_JOIN: &str = "LEFT JOIN (
        SELECT quiz_id, SUM(marks)::BIGINT AS total_marks FROM questions GROUP BY quiz_id
    ) qm ON qm.quiz_id = sc.quiz_id";

pub(crate) const PERCENT: &str = "CASE WHEN COALESCE(qm.total_marks, 0) > 0 \
    THEN sc.total_scored * 100.0 / qm.total_marks ELSE 0 END";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AdminTotals {
    pub(crate) total_users: i64,
    pub(crate) total_subjects: i64,
    pub(crate) total_chapters: i64,
    pub(crate) total_quizzes: i64,
    pub(crate) total_questions: i64,
    pub(crate) total_attempts: i64,
    pub(crate) active_quizzes: i64,
    pub(crate) inactive_quizzes: i64,
    pub(crate) admin_users: i64,
    pub(crate) regular_users: i64,
    pub(crate) avg_score: f64,
    pub(crate) avg_percentage: f64,
}

pub(crate) async fn admin_totals(pool: &PgPool) -> Result<AdminTotals, sqlx::Error> {
    let is_admin = "EXISTS (SELECT 1 FROM user_roles ur JOIN roles r ON r.id = ur.role_id \
        WHERE ur.user_id = u.id AND r.name = 'admin')";

    sqlx::query_as::<_, AdminTotals>(&format!(
        "SELECT
            (SELECT COUNT(*) FROM users WHERE is_active) AS total_users,
            (SELECT COUNT(*) FROM subjects) AS total_subjects,
            (SELECT COUNT(*) FROM chapters) AS total_chapters,
            (SELECT COUNT(*) FROM quizzes) AS total_quizzes,
            (SELECT COUNT(*) FROM questions) AS total_questions,
            (SELECT COUNT(*) FROM scores) AS total_attempts,
            (SELECT COUNT(*) FROM quizzes WHERE is_active) AS active_quizzes,
            (SELECT COUNT(*) FROM quizzes WHERE NOT is_active) AS inactive_quizzes,
            (SELECT COUNT(*) FROM users u WHERE {is_admin}) AS admin_users,
            (SELECT COUNT(*) FROM users u WHERE NOT {is_admin}) AS regular_users,
            (SELECT COALESCE(AVG(total_scored), 0)::FLOAT8 FROM scores) AS avg_score,
            (SELECT COALESCE(AVG({PERCENT}), 0)::FLOAT8 FROM scores sc {QUIZ_MARKS_JOIN})
                AS avg_percentage"
    ))
    .fetch_one(pool)
    .await
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct QuizPopularity {
    pub(crate) quiz_id: String,
    pub(crate) title: String,
    pub(crate) attempts: i64,
    pub(crate) avg_percentage: f64,
}

/// Most attempted quizzes.
pub(crate) async fn top_quizzes(pool: &PgPool, limit: i64) -> Result<Vec<QuizPopularity>, sqlx::Error> {
    sqlx::query_as::<_, QuizPopularity>(&format!(
        "SELECT q.id AS quiz_id, q.title, COUNT(sc.id) AS attempts,
                COALESCE(AVG({PERCENT}), 0)::FLOAT8 AS avg_percentage
         FROM scores sc
         JOIN quizzes q ON q.id = sc.quiz_id
         {QUIZ_MARKS_JOIN}
         GROUP BY q.id, q.title
         ORDER BY attempts DESC, q.title
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Attempt counts per calendar month since `since`. Months without attempts are absent.
pub(crate) async fn monthly_attempts(
    pool: &PgPool,
    user_id: Option<&str>,
    since: PrimitiveDateTime,
) -> Result<Vec<(PrimitiveDateTime, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (PrimitiveDateTime, i64)>(
        "SELECT date_trunc('month', time_stamp_of_attempt) AS month, COUNT(*)
         FROM scores
         WHERE time_stamp_of_attempt >= $1 AND ($2::TEXT IS NULL OR user_id = $2)
         GROUP BY 1
         ORDER BY 1",
    )
    .bind(since)
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Attempt counts per 20-point percentage bucket (0..=4). Empty buckets are absent.
pub(crate) async fn percentage_buckets(pool: &PgPool) -> Result<Vec<(i32, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (i32, i64)>(&format!(
        "SELECT LEAST(FLOOR(pct / 20), 4)::INT AS bucket, COUNT(*)
         FROM (SELECT {PERCENT} AS pct FROM scores sc {QUIZ_MARKS_JOIN}) attempts
         GROUP BY 1
         ORDER BY 1"
    ))
    .fetch_all(pool)
    .await
}

/// Newest attempts, optionally for one user.
pub(crate) async fn recent_scores(
    pool: &PgPool,
    user_id: Option<&str>,
    limit: i64,
) -> Result<Vec<Score>, sqlx::Error> {
    sqlx::query_as::<_, Score>(&format!(
        "SELECT {} {}
         WHERE ($1::TEXT IS NULL OR sc.user_id = $1)
         ORDER BY sc.time_stamp_of_attempt DESC, sc.id
         LIMIT $2",
        scores::COLUMNS,
        scores::FROM
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Clone, Default, Serialize, FromRow)]
pub(crate) struct UserTotals {
    pub(crate) total_attempts: i64,
    pub(crate) total_scored: i64,
    /// Mean of per-attempt percentages, as on the admin dashboard and in exports.
    pub(crate) avg_percentage: f64,
}

pub(crate) async fn user_totals(pool: &PgPool, user_id: &str) -> Result<UserTotals, sqlx::Error> {
    sqlx::query_as::<_, UserTotals>(&format!(
        "SELECT COUNT(*) AS total_attempts,
                COALESCE(SUM(sc.total_scored), 0)::BIGINT AS total_scored,
                COALESCE(AVG({PERCENT}), 0)::FLOAT8 AS avg_percentage
         FROM scores sc
         {QUIZ_MARKS_JOIN}
         WHERE sc.user_id = $1"
    ))
    .bind(user_id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn best_score(pool: &PgPool, user_id: &str) -> Result<Option<Score>, sqlx::Error> {
    sqlx::query_as::<_, Score>(&format!(
        "SELECT {} {}
         WHERE sc.user_id = $1
         ORDER BY sc.total_scored DESC, sc.time_stamp_of_attempt DESC
         LIMIT 1",
        scores::COLUMNS,
        scores::FROM
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn active_quiz_count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quizzes WHERE is_active")
        .fetch_one(pool)
        .await
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct SubjectQuizCount {
    pub(crate) subject: String,
    pub(crate) quiz_count: i64,
}

/// Active quizzes grouped by subject; subjects without any are omitted.
pub(crate) async fn active_quizzes_by_subject(
    pool: &PgPool,
) -> Result<Vec<SubjectQuizCount>, sqlx::Error> {
    sqlx::query_as::<_, SubjectQuizCount>(
        "SELECT s.name AS subject, COUNT(q.id) AS quiz_count
         FROM subjects s
         JOIN chapters c ON c.subject_id = s.id
         JOIN quizzes q ON q.chapter_id = c.id
         WHERE q.is_active
         GROUP BY s.id, s.name
         ORDER BY s.name",
    )
    .fetch_all(pool)
    .await
}
