use anyhow::Context;
use sqlx::PgPool;
use time::macros::date;
use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::{ADMIN_ROLE, USER_ROLE};
use crate::repositories;

pub(crate) async fn ensure_roles(pool: &PgPool) -> anyhow::Result<()> {
    repositories::roles::ensure(pool, ADMIN_ROLE, "Administrator").await?;
    repositories::roles::ensure(pool, USER_ROLE, "Regular User").await?;
    Ok(())
}

/// Creates the configured admin account, or repairs its password, activity and role.
pub(crate) async fn ensure_superuser(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_superuser_password.is_empty() {
        tracing::warn!("FIRST_SUPERUSER_PASSWORD not configured; skipping superuser creation");
        return Ok(());
    }

    let username = &admin.first_superuser_username;
    let now = primitive_now_utc();

    if let Some(user) = repositories::users::find_by_login(state.db(), username).await? {
        let verified =
            security::verify_password(&admin.first_superuser_password, &user.password_hash)
                .unwrap_or(false);
        let password_hash = if verified {
            None
        } else {
            Some(security::hash_password(&admin.first_superuser_password)?)
        };

        let needs_update = password_hash.is_some() || !user.is_active;
        if needs_update {
            repositories::users::update(
                state.db(),
                &user.id,
                repositories::users::UpdateUser {
                    full_name: None,
                    qualification: None,
                    date_of_birth: None,
                    is_active: Some(true),
                    password_hash,
                    updated_at: now,
                },
            )
            .await?;
        }
        let granted = repositories::roles::assign(state.db(), &user.id, ADMIN_ROLE).await?;

        if needs_update || granted {
            tracing::info!(username = %username, "Updated default superuser");
        } else {
            tracing::info!("Default superuser already up to date");
        }
        return Ok(());
    }

    let id = Uuid::new_v4().to_string();
    let mut tx = state.db().begin().await?;
    repositories::users::create(
        &mut *tx,
        repositories::users::CreateUser {
            id: &id,
            username,
            email: &admin.first_superuser_email,
            password_hash: security::hash_password(&admin.first_superuser_password)?,
            full_name: "Administrator",
            qualification: None,
            date_of_birth: None,
            is_active: true,
            created_at: now,
        },
    )
    .await?;
    repositories::roles::assign(&mut *tx, &id, ADMIN_ROLE).await?;
    tx.commit().await?;

    tracing::info!(username = %username, "Created default superuser");
    Ok(())
}

const DEMO_QUESTIONS: [(&str, [&str; 4], i32); 4] = [
    (
        "What is a variable in programming?",
        ["A container for data", "A type of loop", "A programming language", "Hardware component"],
        1,
    ),
    ("Which is a programming language?", ["HTML", "CSS", "Python", "JSON"], 3),
    (
        "What does \"if-else\" represent?",
        ["A loop", "A conditional statement", "A function", "A variable"],
        2,
    ),
    (
        "Purpose of comments in code?",
        ["Execute code", "Make code faster", "Explain code", "Create variables"],
        3,
    ),
];

const EXTRA_SUBJECTS: [(&str, &str, &str, &str); 2] = [
    ("Mathematics", "Mathematical concepts", "Algebra", "Basic algebra"),
    ("Data Structures", "Data organization", "Arrays", "Linear structures"),
];

/// Demo content for fresh installs. Safe to run repeatedly.
pub(crate) async fn seed_default_data(state: &AppState) -> anyhow::Result<()> {
    let pool = state.db();
    let now = primitive_now_utc();

    if !repositories::users::exists_by_username(pool, "dummy").await? {
        let id = Uuid::new_v4().to_string();
        let mut tx = pool.begin().await?;
        repositories::users::create(
            &mut *tx,
            repositories::users::CreateUser {
                id: &id,
                username: "dummy",
                email: "dummy@example.com",
                password_hash: security::hash_password("dummy123")?,
                full_name: "Test Student",
                qualification: Some("Bachelor of Science"),
                date_of_birth: Some(date!(1995 - 05 - 15)),
                is_active: true,
                created_at: now,
            },
        )
        .await?;
        repositories::roles::assign(&mut *tx, &id, USER_ROLE).await?;
        tx.commit().await?;
    }

    let subject_id =
        upsert_subject(pool, "Computer Science", "Fundamental computer science concepts").await?;
    let chapter_id = upsert_chapter(
        pool,
        &subject_id,
        "Programming Basics",
        "Introduction to programming concepts",
    )
    .await?;

    let quiz_id = match sqlx::query_scalar::<_, String>(
        "SELECT id FROM quizzes WHERE chapter_id = $1 AND title = $2",
    )
    .bind(&chapter_id)
    .bind("Basic Programming Quiz")
    .fetch_optional(pool)
    .await?
    {
        Some(id) => id,
        None => {
            let id = Uuid::new_v4().to_string();
            repositories::quizzes::create(
                pool,
                repositories::quizzes::CreateQuiz {
                    id: &id,
                    chapter_id: &chapter_id,
                    title: "Basic Programming Quiz",
                    date_of_quiz: now.date(),
                    time_duration: "00:30",
                    remarks: "Test your programming knowledge",
                    is_active: true,
                    created_at: now,
                },
            )
            .await?;
            id
        }
    };

    for (statement, options, correct_option) in DEMO_QUESTIONS {
        sqlx::query(
            "INSERT INTO questions (
                id, quiz_id, question_statement, option1, option2, option3, option4,
                correct_option, marks, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 25, $9, $9)
            ON CONFLICT (quiz_id, question_statement) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&quiz_id)
        .bind(statement)
        .bind(options[0])
        .bind(options[1])
        .bind(options[2])
        .bind(options[3])
        .bind(correct_option)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to seed demo question")?;
    }

    for (subject, description, chapter, chapter_description) in EXTRA_SUBJECTS {
        let subject_id = upsert_subject(pool, subject, description).await?;
        upsert_chapter(pool, &subject_id, chapter, chapter_description).await?;
    }

    tracing::info!("Default data ensured");
    Ok(())
}

async fn upsert_subject(pool: &PgPool, name: &str, description: &str) -> anyhow::Result<String> {
    let now = primitive_now_utc();
    sqlx::query(
        "INSERT INTO subjects (id, name, description, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $4)
         ON CONFLICT (name) DO NOTHING",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .bind(description)
    .bind(now)
    .execute(pool)
    .await?;

    sqlx::query_scalar::<_, String>("SELECT id FROM subjects WHERE name = $1")
        .bind(name)
        .fetch_one(pool)
        .await
        .with_context(|| format!("Failed to seed subject {name}"))
}

async fn upsert_chapter(
    pool: &PgPool,
    subject_id: &str,
    name: &str,
    description: &str,
) -> anyhow::Result<String> {
    let now = primitive_now_utc();
    sqlx::query(
        "INSERT INTO chapters (id, subject_id, name, description, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $5)
         ON CONFLICT (subject_id, name) DO NOTHING",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(subject_id)
    .bind(name)
    .bind(description)
    .bind(now)
    .execute(pool)
    .await?;

    sqlx::query_scalar::<_, String>("SELECT id FROM chapters WHERE subject_id = $1 AND name = $2")
        .bind(subject_id)
        .bind(name)
        .fetch_one(pool)
        .await
        .with_context(|| format!("Failed to seed chapter {name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn seeding_twice_creates_nothing_new() {
        let Some(ctx) = test_support::setup_test_context().await else {
            return;
        };

        seed_default_data(&ctx.state).await.unwrap();
        let counts = || async {
            sqlx::query_as::<_, (i64, i64, i64, i64)>(
                "SELECT (SELECT COUNT(*) FROM subjects), (SELECT COUNT(*) FROM chapters),
                        (SELECT COUNT(*) FROM quizzes), (SELECT COUNT(*) FROM questions)",
            )
            .fetch_one(ctx.state.db())
            .await
            .unwrap()
        };
        let first = counts().await;
        seed_default_data(&ctx.state).await.unwrap();

        assert_eq!(first, (3, 3, 1, 4));
        assert_eq!(counts().await, first);
    }

    #[tokio::test]
    async fn superuser_is_created_with_admin_role() {
        let Some(ctx) = test_support::setup_test_context().await else {
            return;
        };

        ensure_superuser(&ctx.state).await.unwrap();
        ensure_superuser(&ctx.state).await.unwrap();

        let username = &ctx.state.settings().admin().first_superuser_username;
        let admin = repositories::users::find_by_login(ctx.state.db(), username)
            .await
            .unwrap()
            .expect("superuser");
        assert!(admin.is_admin());
        assert!(admin.is_active);
    }
}
