use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use time::{Date, PrimitiveDateTime};

use crate::db::models::User;
use crate::db::types::ADMIN_ROLE;

pub(crate) const COLUMNS: &str = "\
    u.id, u.username, u.email, u.password_hash, u.full_name, u.qualification, \
    u.date_of_birth, u.is_active, u.created_at, u.updated_at, \
    ARRAY(SELECT r.name FROM user_roles ur JOIN roles r ON r.id = ur.role_id \
          WHERE ur.user_id = u.id ORDER BY r.name)::TEXT[] AS roles";

const IS_ADMIN: &str = "EXISTS (SELECT 1 FROM user_roles ur JOIN roles r ON r.id = ur.role_id \
     WHERE ur.user_id = u.id AND r.name = 'admin')";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users u WHERE u.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Looks a user up by username or email.
pub(crate) async fn find_by_login(pool: &PgPool, login: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users u WHERE u.username = $1 OR lower(u.email) = lower($1)"
    ))
    .bind(login)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn exists_by_username(pool: &PgPool, username: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
        .bind(username)
        .fetch_one(pool)
        .await
}

pub(crate) async fn exists_by_email(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM users WHERE lower(email) = lower($1))",
    )
    .bind(email)
    .fetch_one(pool)
    .await
}

pub(crate) struct CreateUser<'a> {
    pub(crate) id: &'a str,
    pub(crate) username: &'a str,
    pub(crate) email: &'a str,
    pub(crate) password_hash: String,
    pub(crate) full_name: &'a str,
    pub(crate) qualification: Option<&'a str>,
    pub(crate) date_of_birth: Option<Date>,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    params: CreateUser<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (
            id, username, email, password_hash, full_name, qualification,
            date_of_birth, is_active, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$9)",
    )
    .bind(params.id)
    .bind(params.username)
    .bind(params.email)
    .bind(params.password_hash)
    .bind(params.full_name)
    .bind(params.qualification)
    .bind(params.date_of_birth)
    .bind(params.is_active)
    .bind(params.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) struct UpdateUser {
    pub(crate) full_name: Option<String>,
    pub(crate) qualification: Option<String>,
    pub(crate) date_of_birth: Option<Date>,
    pub(crate) is_active: Option<bool>,
    pub(crate) password_hash: Option<String>,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn update(
    executor: impl PgExecutor<'_>,
    id: &str,
    params: UpdateUser,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET
            full_name = COALESCE($1, full_name),
            qualification = COALESCE($2, qualification),
            date_of_birth = COALESCE($3, date_of_birth),
            is_active = COALESCE($4, is_active),
            password_hash = COALESCE($5, password_hash),
            updated_at = $6
         WHERE id = $7",
    )
    .bind(params.full_name)
    .bind(params.qualification)
    .bind(params.date_of_birth)
    .bind(params.is_active)
    .bind(params.password_hash)
    .bind(params.updated_at)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected())
}

pub(crate) struct ListUsers<'a> {
    pub(crate) search: Option<&'a str>,
    pub(crate) role: Option<&'a str>,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}

pub(crate) async fn list(pool: &PgPool, params: ListUsers<'_>) -> Result<Vec<User>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM users u WHERE TRUE"));

    if let Some(search) = params.search {
        let pattern = format!("%{}%", search.trim());
        builder.push(" AND (u.username ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR u.email ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR u.full_name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR u.qualification ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    match params.role {
        Some(role) if role == ADMIN_ROLE => {
            builder.push(format!(" AND {IS_ADMIN}"));
        }
        Some(_) => {
            builder.push(format!(" AND NOT {IS_ADMIN}"));
        }
        None => {}
    }

    builder.push(" ORDER BY u.created_at DESC, u.username");
    builder.push(" OFFSET ");
    builder.push_bind(params.skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(params.limit.clamp(1, 1000));

    builder.build_query_as::<User>().fetch_all(pool).await
}

/// Active accounts without the admin role.
pub(crate) async fn list_active_students(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users u WHERE u.is_active AND NOT {IS_ADMIN} ORDER BY u.username"
    ))
    .fetch_all(pool)
    .await
}

/// Row lock that serialises concurrent attempt submissions by one user.
pub(crate) async fn lock_for_update(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(executor)
        .await
}
