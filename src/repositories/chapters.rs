use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Chapter;

pub(crate) const COLUMNS: &str = "\
    c.id, c.subject_id, s.name AS subject_name, c.name, c.description, \
    (SELECT COUNT(*) FROM quizzes q WHERE q.chapter_id = c.id) AS quizzes_count, \
    c.created_at, c.updated_at";

pub(crate) const FROM: &str = "FROM chapters c JOIN subjects s ON s.id = c.subject_id";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Chapter>, sqlx::Error> {
    sqlx::query_as::<_, Chapter>(&format!("SELECT {COLUMNS} {FROM} WHERE c.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn exists(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM chapters WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Chapter names are unique per subject, compared case-insensitively.
pub(crate) async fn name_taken(
    pool: &PgPool,
    subject_id: &str,
    name: &str,
    except_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (
            SELECT 1 FROM chapters
            WHERE subject_id = $1 AND lower(name) = lower($2)
              AND ($3::TEXT IS NULL OR id <> $3)
        )",
    )
    .bind(subject_id)
    .bind(name)
    .bind(except_id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list(
    pool: &PgPool,
    search: Option<&str>,
    subject_id: Option<&str>,
) -> Result<Vec<Chapter>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} {FROM} WHERE TRUE"));

    if let Some(subject_id) = subject_id {
        builder.push(" AND c.subject_id = ");
        builder.push_bind(subject_id.to_string());
    }
    if let Some(search) = search {
        let pattern = format!("%{}%", search.trim());
        builder.push(" AND (c.name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR c.description ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    builder.push(" ORDER BY s.name, c.name");
    builder.build_query_as::<Chapter>().fetch_all(pool).await
}

pub(crate) struct CreateChapter<'a> {
    pub(crate) id: &'a str,
    pub(crate) subject_id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) description: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateChapter<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO chapters (id, subject_id, name, description, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $5)",
    )
    .bind(params.id)
    .bind(params.subject_id)
    .bind(params.name)
    .bind(params.description)
    .bind(params.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) struct UpdateChapter<'a> {
    pub(crate) subject_id: Option<&'a str>,
    pub(crate) name: Option<&'a str>,
    pub(crate) description: Option<&'a str>,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateChapter<'_>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE chapters SET
            subject_id = COALESCE($1, subject_id),
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            updated_at = $4
         WHERE id = $5",
    )
    .bind(params.subject_id)
    .bind(params.name)
    .bind(params.description)
    .bind(params.updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM chapters WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected())
}
