use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Score;

/// `total_marks` is recomputed from the quiz's current questions on every read.
pub(crate) const COLUMNS: &str = "\
    sc.id, sc.user_id, u.full_name AS user_name, sc.quiz_id, q.title AS quiz_title, \
    sc.time_stamp_of_attempt, sc.total_scored, sc.total_questions, sc.time_taken, \
    (SELECT COALESCE(SUM(qs.marks), 0) FROM questions qs WHERE qs.quiz_id = sc.quiz_id)::BIGINT \
        AS total_marks";

pub(crate) const FROM: &str = "FROM scores sc \
    JOIN users u ON u.id = sc.user_id \
    JOIN quizzes q ON q.id = sc.quiz_id";

pub(crate) async fn find_by_id(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<Score>, sqlx::Error> {
    sqlx::query_as::<_, Score>(&format!("SELECT {COLUMNS} {FROM} WHERE sc.id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Attempts newest first, optionally restricted to one user and/or quiz.
pub(crate) async fn list(
    pool: &PgPool,
    user_id: Option<&str>,
    quiz_id: Option<&str>,
) -> Result<Vec<Score>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} {FROM} WHERE TRUE"));

    if let Some(user_id) = user_id {
        builder.push(" AND sc.user_id = ");
        builder.push_bind(user_id.to_string());
    }
    if let Some(quiz_id) = quiz_id {
        builder.push(" AND sc.quiz_id = ");
        builder.push_bind(quiz_id.to_string());
    }

    builder.push(" ORDER BY sc.time_stamp_of_attempt DESC, sc.id");
    builder.build_query_as::<Score>().fetch_all(pool).await
}

pub(crate) async fn count_attempts(
    executor: impl PgExecutor<'_>,
    user_id: &str,
    quiz_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM scores WHERE user_id = $1 AND quiz_id = $2")
        .bind(user_id)
        .bind(quiz_id)
        .fetch_one(executor)
        .await
}

pub(crate) struct CreateScore<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) quiz_id: &'a str,
    pub(crate) time_stamp_of_attempt: PrimitiveDateTime,
    pub(crate) total_scored: i32,
    pub(crate) total_questions: i32,
    pub(crate) time_taken: &'a str,
}

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    params: CreateScore<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO scores (
            id, user_id, quiz_id, time_stamp_of_attempt, total_scored, total_questions, time_taken
        ) VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.quiz_id)
    .bind(params.time_stamp_of_attempt)
    .bind(params.total_scored)
    .bind(params.total_questions)
    .bind(params.time_taken)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn last_attempt_at(
    pool: &PgPool,
    user_id: &str,
) -> Result<Option<PrimitiveDateTime>, sqlx::Error> {
    sqlx::query_scalar::<_, Option<PrimitiveDateTime>>(
        "SELECT MAX(time_stamp_of_attempt) FROM scores WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}
