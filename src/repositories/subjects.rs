use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Subject;

pub(crate) const COLUMNS: &str = "\
    s.id, s.name, s.description, \
    (SELECT COUNT(*) FROM chapters c WHERE c.subject_id = s.id) AS chapters_count, \
    s.created_at, s.updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!("SELECT {COLUMNS} FROM subjects s WHERE s.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn exists(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM subjects WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Case-insensitive name lookup, optionally ignoring one subject.
pub(crate) async fn name_taken(
    pool: &PgPool,
    name: &str,
    except_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (
            SELECT 1 FROM subjects
            WHERE lower(name) = lower($1) AND ($2::TEXT IS NULL OR id <> $2)
        )",
    )
    .bind(name)
    .bind(except_id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list(pool: &PgPool, search: Option<&str>) -> Result<Vec<Subject>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM subjects s"));
    if let Some(search) = search {
        let pattern = format!("%{}%", search.trim());
        builder.push(" WHERE s.name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR s.description ILIKE ");
        builder.push_bind(pattern);
    }
    builder.push(" ORDER BY s.name");
    builder.build_query_as::<Subject>().fetch_all(pool).await
}

pub(crate) struct CreateSubject<'a> {
    pub(crate) id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) description: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateSubject<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO subjects (id, name, description, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $4)",
    )
    .bind(params.id)
    .bind(params.name)
    .bind(params.description)
    .bind(params.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) struct UpdateSubject<'a> {
    pub(crate) name: Option<&'a str>,
    pub(crate) description: Option<&'a str>,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateSubject<'_>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE subjects SET
            name = COALESCE($1, name),
            description = COALESCE($2, description),
            updated_at = $3
         WHERE id = $4",
    )
    .bind(params.name)
    .bind(params.description)
    .bind(params.updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Deletes the subject; chapters, quizzes, questions and scores cascade.
pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM subjects WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected())
}
