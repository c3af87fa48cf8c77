use sqlx::PgPool;

use crate::db::models::{Chapter, Question, Quiz, Subject, User};
use crate::repositories::{chapters, questions, quizzes, subjects, users};

/// Rows returned per entity type.
pub(crate) const RESULT_LIMIT: i64 = 10;

fn pattern(query: &str) -> String {
    format!("%{}%", query.trim())
}

pub(crate) async fn users(pool: &PgPool, query: &str) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users u
         WHERE u.username ILIKE $1 OR u.email ILIKE $1
            OR u.full_name ILIKE $1 OR u.qualification ILIKE $1
         ORDER BY u.username
         LIMIT $2",
        users::COLUMNS
    ))
    .bind(pattern(query))
    .bind(RESULT_LIMIT)
    .fetch_all(pool)
    .await
}

pub(crate) async fn subjects(pool: &PgPool, query: &str) -> Result<Vec<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "SELECT {} FROM subjects s
         WHERE s.name ILIKE $1 OR s.description ILIKE $1
         ORDER BY s.name
         LIMIT $2",
        subjects::COLUMNS
    ))
    .bind(pattern(query))
    .bind(RESULT_LIMIT)
    .fetch_all(pool)
    .await
}

pub(crate) async fn chapters(pool: &PgPool, query: &str) -> Result<Vec<Chapter>, sqlx::Error> {
    sqlx::query_as::<_, Chapter>(&format!(
        "SELECT {} {}
         WHERE c.name ILIKE $1 OR c.description ILIKE $1
         ORDER BY s.name, c.name
         LIMIT $2",
        chapters::COLUMNS,
        chapters::FROM
    ))
    .bind(pattern(query))
    .bind(RESULT_LIMIT)
    .fetch_all(pool)
    .await
}

pub(crate) async fn quizzes(pool: &PgPool, query: &str) -> Result<Vec<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "SELECT {} {}
         WHERE q.title ILIKE $1 OR q.remarks ILIKE $1
         ORDER BY q.date_of_quiz DESC, q.title
         LIMIT $2",
        quizzes::COLUMNS,
        quizzes::FROM
    ))
    .bind(pattern(query))
    .bind(RESULT_LIMIT)
    .fetch_all(pool)
    .await
}

pub(crate) async fn questions(pool: &PgPool, query: &str) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {} {}
         WHERE qs.question_statement ILIKE $1
            OR qs.option1 ILIKE $1 OR qs.option2 ILIKE $1
            OR qs.option3 ILIKE $1 OR qs.option4 ILIKE $1
         ORDER BY q.title, qs.created_at
         LIMIT $2",
        questions::COLUMNS,
        questions::FROM
    ))
    .bind(pattern(query))
    .bind(RESULT_LIMIT)
    .fetch_all(pool)
    .await
}
