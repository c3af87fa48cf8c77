use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Question;
use crate::services::scoring::AnswerKey;

pub(crate) const COLUMNS: &str = "\
    qs.id, qs.quiz_id, q.title AS quiz_title, qs.question_statement, \
    qs.option1, qs.option2, qs.option3, qs.option4, qs.correct_option, qs.marks, \
    qs.created_at, qs.updated_at";

pub(crate) const FROM: &str = "FROM questions qs JOIN quizzes q ON q.id = qs.quiz_id";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} {FROM} WHERE qs.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list(
    pool: &PgPool,
    quiz_id: Option<&str>,
    search: Option<&str>,
) -> Result<Vec<Question>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} {FROM} WHERE TRUE"));

    if let Some(quiz_id) = quiz_id {
        builder.push(" AND qs.quiz_id = ");
        builder.push_bind(quiz_id.to_string());
    }
    if let Some(search) = search {
        builder.push(" AND qs.question_statement ILIKE ");
        builder.push_bind(format!("%{}%", search.trim()));
    }

    builder.push(" ORDER BY qs.quiz_id, qs.created_at, qs.id");
    builder.build_query_as::<Question>().fetch_all(pool).await
}

pub(crate) async fn list_for_quiz(
    executor: impl PgExecutor<'_>,
    quiz_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} {FROM} WHERE qs.quiz_id = $1 ORDER BY qs.created_at, qs.id"
    ))
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}

/// Correct options and weights for every question in a quiz.
pub(crate) async fn answer_keys(
    executor: impl PgExecutor<'_>,
    quiz_id: &str,
) -> Result<Vec<AnswerKey>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, i32, i32)>(
        "SELECT id, correct_option, marks FROM questions WHERE quiz_id = $1 ORDER BY created_at, id",
    )
    .bind(quiz_id)
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(question_id, correct_option, marks)| AnswerKey { question_id, correct_option, marks })
        .collect())
}

pub(crate) async fn statement_taken(
    pool: &PgPool,
    quiz_id: &str,
    statement: &str,
    except_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (
            SELECT 1 FROM questions
            WHERE quiz_id = $1 AND question_statement = $2
              AND ($3::TEXT IS NULL OR id <> $3)
        )",
    )
    .bind(quiz_id)
    .bind(statement)
    .bind(except_id)
    .fetch_one(pool)
    .await
}

pub(crate) struct QuestionFields<'a> {
    pub(crate) quiz_id: &'a str,
    pub(crate) question_statement: &'a str,
    pub(crate) option1: &'a str,
    pub(crate) option2: &'a str,
    pub(crate) option3: Option<&'a str>,
    pub(crate) option4: Option<&'a str>,
    pub(crate) correct_option: i32,
    pub(crate) marks: i32,
}

pub(crate) async fn create(
    pool: &PgPool,
    id: &str,
    fields: QuestionFields<'_>,
    created_at: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO questions (
            id, quiz_id, question_statement, option1, option2, option3, option4,
            correct_option, marks, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)",
    )
    .bind(id)
    .bind(fields.quiz_id)
    .bind(fields.question_statement)
    .bind(fields.option1)
    .bind(fields.option2)
    .bind(fields.option3)
    .bind(fields.option4)
    .bind(fields.correct_option)
    .bind(fields.marks)
    .bind(created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Full replacement; optional options are cleared when absent.
pub(crate) async fn replace(
    pool: &PgPool,
    id: &str,
    fields: QuestionFields<'_>,
    updated_at: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE questions SET
            quiz_id = $1,
            question_statement = $2,
            option1 = $3,
            option2 = $4,
            option3 = $5,
            option4 = $6,
            correct_option = $7,
            marks = $8,
            updated_at = $9
         WHERE id = $10",
    )
    .bind(fields.quiz_id)
    .bind(fields.question_statement)
    .bind(fields.option1)
    .bind(fields.option2)
    .bind(fields.option3)
    .bind(fields.option4)
    .bind(fields.correct_option)
    .bind(fields.marks)
    .bind(updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected())
}
