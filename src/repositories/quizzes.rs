use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use time::{Date, PrimitiveDateTime};

use crate::db::models::Quiz;

pub(crate) const COLUMNS: &str = "\
    q.id, q.chapter_id, c.name AS chapter_name, c.subject_id, s.name AS subject_name, \
    q.title, q.date_of_quiz, q.time_duration, q.remarks, q.is_active, \
    (SELECT COUNT(*) FROM questions qs WHERE qs.quiz_id = q.id) AS question_count, \
    (SELECT COALESCE(SUM(qs.marks), 0) FROM questions qs WHERE qs.quiz_id = q.id)::BIGINT AS total_marks, \
    q.created_at, q.updated_at";

pub(crate) const FROM: &str = "FROM quizzes q \
    JOIN chapters c ON c.id = q.chapter_id \
    JOIN subjects s ON s.id = c.subject_id";

pub(crate) async fn find_by_id(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!("SELECT {COLUMNS} {FROM} WHERE q.id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn exists(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM quizzes WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
}

#[derive(Debug, Default)]
pub(crate) struct QuizFilter<'a> {
    pub(crate) search: Option<&'a str>,
    pub(crate) chapter_id: Option<&'a str>,
    pub(crate) is_active: Option<bool>,
}

pub(crate) async fn list(pool: &PgPool, filter: QuizFilter<'_>) -> Result<Vec<Quiz>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} {FROM} WHERE TRUE"));

    if let Some(chapter_id) = filter.chapter_id {
        builder.push(" AND q.chapter_id = ");
        builder.push_bind(chapter_id.to_string());
    }
    if let Some(is_active) = filter.is_active {
        builder.push(" AND q.is_active = ");
        builder.push_bind(is_active);
    }
    if let Some(search) = filter.search {
        let pattern = format!("%{}%", search.trim());
        builder.push(" AND (q.title ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR q.remarks ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    builder.push(" ORDER BY q.date_of_quiz DESC, q.title");
    builder.build_query_as::<Quiz>().fetch_all(pool).await
}

pub(crate) struct CreateQuiz<'a> {
    pub(crate) id: &'a str,
    pub(crate) chapter_id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) date_of_quiz: Date,
    pub(crate) time_duration: &'a str,
    pub(crate) remarks: &'a str,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateQuiz<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO quizzes (
            id, chapter_id, title, date_of_quiz, time_duration, remarks, is_active,
            created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)",
    )
    .bind(params.id)
    .bind(params.chapter_id)
    .bind(params.title)
    .bind(params.date_of_quiz)
    .bind(params.time_duration)
    .bind(params.remarks)
    .bind(params.is_active)
    .bind(params.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) struct UpdateQuiz<'a> {
    pub(crate) chapter_id: Option<&'a str>,
    pub(crate) title: Option<&'a str>,
    pub(crate) date_of_quiz: Option<Date>,
    pub(crate) time_duration: Option<&'a str>,
    pub(crate) remarks: Option<&'a str>,
    pub(crate) is_active: Option<bool>,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateQuiz<'_>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE quizzes SET
            chapter_id = COALESCE($1, chapter_id),
            title = COALESCE($2, title),
            date_of_quiz = COALESCE($3, date_of_quiz),
            time_duration = COALESCE($4, time_duration),
            remarks = COALESCE($5, remarks),
            is_active = COALESCE($6, is_active),
            updated_at = $7
         WHERE id = $8",
    )
    .bind(params.chapter_id)
    .bind(params.title)
    .bind(params.date_of_quiz)
    .bind(params.time_duration)
    .bind(params.remarks)
    .bind(params.is_active)
    .bind(params.updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM quizzes WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected())
}

/// Titles of active quizzes created after `since`, newest first.
pub(crate) async fn active_titles_created_after(
    pool: &PgPool,
    since: Option<PrimitiveDateTime>,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT title FROM quizzes
         WHERE is_active AND ($1::TIMESTAMP IS NULL OR created_at > $1)
         ORDER BY created_at DESC",
    )
    .bind(since)
    .fetch_all(pool)
    .await
}
