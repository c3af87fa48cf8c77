use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::db::models::Role;

pub(crate) async fn ensure(pool: &PgPool, name: &str, description: &str) -> Result<Role, sqlx::Error> {
    sqlx::query(
        "INSERT INTO roles (id, name, description) VALUES ($1, $2, $3)
         ON CONFLICT (name) DO NOTHING",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .bind(description)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, Role>("SELECT id, name, description FROM roles WHERE name = $1")
        .bind(name)
        .fetch_one(pool)
        .await
}

/// Grants a role by name. Returns true when the grant is new.
pub(crate) async fn assign(
    executor: impl PgExecutor<'_>,
    user_id: &str,
    role_name: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO user_roles (user_id, role_id)
         SELECT $1, id FROM roles WHERE name = $2
         ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(role_name)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}
