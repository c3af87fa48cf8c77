//! Role-dependent dashboard. Admins share one cached summary; students get
//! one per user. Both are rebuilt from raw rows on a cache miss.

use axum::{extract::State, routing::get, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::cache::{Namespace, DASHBOARD_TTL};
use crate::core::state::AppState;
use crate::core::time::{format_date, format_primitive, primitive_now_utc};
use crate::db::models::User;
use crate::repositories::dashboard as queries;
use crate::schemas::dashboard::{
    AdminCharts, AdminDashboard, DashboardResponse, LabelledCount, RecentPerformance,
    UserCharts, UserDashboard, UserInfo, UserStatistics,
};
use crate::schemas::score::ScoreResponse;
use crate::services::reporting;
use crate::services::scoring::{percentage, round2};

const TOP_QUIZZES: i64 = 5;
const ADMIN_RECENT_SCORES: i64 = 10;
const USER_RECENT_SCORES: i64 = 5;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(dashboard))
}

async fn dashboard(
    CurrentUser { user, .. }: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let suffix = if user.is_admin() { "admin".to_string() } else { format!("user:{}", user.id) };
    let key = state.cache().key(Namespace::Dashboard, &suffix);
    if let Some(cached) = state.cache().get::<DashboardResponse>(&key).await {
        return Ok(Json(cached));
    }

    let response = if user.is_admin() {
        DashboardResponse::Admin(admin_dashboard(&state).await?)
    } else {
        DashboardResponse::User(user_dashboard(&state, user).await?)
    };

    state.cache().set(&key, &response, DASHBOARD_TTL).await;
    Ok(Json(response))
}

fn failed(err: sqlx::Error) -> ApiError {
    ApiError::internal(err, "Failed to build dashboard")
}

async fn admin_dashboard(state: &AppState) -> Result<AdminDashboard, ApiError> {
    let db = state.db();
    let now = primitive_now_utc();

    let mut statistics = queries::admin_totals(db).await.map_err(failed)?;
    statistics.avg_score = round2(statistics.avg_score);
    statistics.avg_percentage = round2(statistics.avg_percentage);

    let mut top_quizzes = queries::top_quizzes(db, TOP_QUIZZES).await.map_err(failed)?;
    for quiz in &mut top_quizzes {
        quiz.avg_percentage = round2(quiz.avg_percentage);
    }

    let monthly = queries::monthly_attempts(db, None, reporting::activity_window_start(now))
        .await
        .map_err(failed)?;
    let buckets = queries::percentage_buckets(db).await.map_err(failed)?;
    let recent = queries::recent_scores(db, None, ADMIN_RECENT_SCORES).await.map_err(failed)?;

    let charts = AdminCharts {
        top_quizzes,
        monthly_activity: reporting::monthly_series(now, &monthly),
        score_distribution: reporting::score_distribution(&buckets),
        quiz_status: vec![
            LabelledCount::new("Active", statistics.active_quizzes),
            LabelledCount::new("Inactive", statistics.inactive_quizzes),
        ],
        user_types: vec![
            LabelledCount::new("Admins", statistics.admin_users),
            LabelledCount::new("Students", statistics.regular_users),
        ],
    };

    Ok(AdminDashboard {
        statistics,
        charts,
        recent_scores: recent.into_iter().map(ScoreResponse::from_db).collect(),
    })
}

async fn user_dashboard(state: &AppState, user: User) -> Result<UserDashboard, ApiError> {
    let db = state.db();
    let now = primitive_now_utc();

    let totals = queries::user_totals(db, &user.id).await.map_err(failed)?;
    let available = queries::active_quiz_count(db).await.map_err(failed)?;
    let best = queries::best_score(db, &user.id).await.map_err(failed)?;
    let recent =
        queries::recent_scores(db, Some(&user.id), USER_RECENT_SCORES).await.map_err(failed)?;
    let by_subject = queries::active_quizzes_by_subject(db).await.map_err(failed)?;
    let monthly =
        queries::monthly_attempts(db, Some(&user.id), reporting::activity_window_start(now))
            .await
            .map_err(failed)?;

    let average_score = if totals.total_attempts > 0 {
        round2(totals.total_scored as f64 / totals.total_attempts as f64)
    } else {
        0.0
    };

    let recent_performance = recent
        .into_iter()
        .map(|score| RecentPerformance {
            percentage: percentage(score.total_scored as i64, score.total_marks),
            date: format_primitive(score.time_stamp_of_attempt),
            quiz_title: score.quiz_title,
            score: score.total_scored,
            total: score.total_marks,
        })
        .collect();

    Ok(UserDashboard {
        statistics: UserStatistics {
            total_attempts: totals.total_attempts,
            total_quizzes_available: available,
            average_score,
            average_percentage: round2(totals.avg_percentage),
            best_score: best.map(ScoreResponse::from_db),
        },
        charts: UserCharts {
            recent_performance,
            available_quizzes: by_subject,
            monthly_activity: reporting::monthly_series(now, &monthly),
        },
        user_info: UserInfo {
            full_name: user.full_name,
            qualification: user.qualification,
            member_since: format_date(user.created_at.date()),
        },
    })
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::core::time::primitive_now_utc;
    use crate::repositories;
    use crate::test_support;

    #[tokio::test]
    async fn dashboards_depend_on_role() {
        let Some(ctx) = test_support::setup_test_context().await else {
            return;
        };
        let admin = test_support::insert_admin(&ctx.state, "admin1", "admin1@example.com").await;
        let student = test_support::insert_user(&ctx.state, "student1", "student1@example.com").await;
        let fixture = test_support::insert_quiz(&ctx.state, "Math", &[(1, 10), (2, 10)]).await;
        repositories::scores::create(
            ctx.state.db(),
            repositories::scores::CreateScore {
                id: "score-dash",
                user_id: &student.id,
                quiz_id: &fixture.quiz_id,
                time_stamp_of_attempt: primitive_now_utc(),
                total_scored: 10,
                total_questions: 2,
                time_taken: "00:09",
            },
        )
        .await
        .expect("insert score");

        let token = test_support::bearer_token(&student.id, ctx.state.settings());
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::GET, "/api/dashboard", Some(&token), None))
            .await
            .expect("user dashboard");
        assert_eq!(response.status(), StatusCode::OK);
        let body = test_support::read_json(response).await;
        assert_eq!(body["dashboard_type"], "user");
        assert_eq!(body["statistics"]["total_attempts"], 1);
        assert_eq!(body["statistics"]["average_percentage"], 50.0);
        assert_eq!(body["charts"]["available_quizzes"], json!([{ "subject": "Math", "quiz_count": 1 }]));
        assert_eq!(body["charts"]["monthly_activity"].as_array().map(Vec::len), Some(6));
        assert_eq!(body["charts"]["monthly_activity"][5]["attempts"], 1);

        let token = test_support::bearer_token(&admin.id, ctx.state.settings());
        let response = ctx
            .app
            .oneshot(test_support::json_request(Method::GET, "/api/dashboard", Some(&token), None))
            .await
            .expect("admin dashboard");
        assert_eq!(response.status(), StatusCode::OK);
        let body = test_support::read_json(response).await;
        assert_eq!(body["dashboard_type"], "admin");
        assert_eq!(body["statistics"]["total_attempts"], 1);
        assert_eq!(body["statistics"]["admin_users"], 1);
        assert_eq!(body["charts"]["score_distribution"][2], json!({ "range": "40-60", "count": 1 }));
        assert_eq!(body["recent_scores"][0]["percentage"], 50.0);
    }

    #[tokio::test]
    async fn average_percentage_is_the_mean_of_attempts() {
        let Some(ctx) = test_support::setup_test_context().await else {
            return;
        };
        let student = test_support::insert_user(&ctx.state, "student1", "student1@example.com").await;
        let short = test_support::insert_quiz(&ctx.state, "Physics", &[(1, 10)]).await;
        let long = test_support::insert_quiz(&ctx.state, "Chemistry", &[(1, 30)]).await;

        let attempts = [("score-full", &short.quiz_id, 10), ("score-zero", &long.quiz_id, 0)];
        for (id, quiz_id, scored) in attempts {
            repositories::scores::create(
                ctx.state.db(),
                repositories::scores::CreateScore {
                    id,
                    user_id: &student.id,
                    quiz_id,
                    time_stamp_of_attempt: primitive_now_utc(),
                    total_scored: scored,
                    total_questions: 1,
                    time_taken: "00:05",
                },
            )
            .await
            .expect("insert score");
        }

        let token = test_support::bearer_token(&student.id, ctx.state.settings());
        let response = ctx
            .app
            .oneshot(test_support::json_request(Method::GET, "/api/dashboard", Some(&token), None))
            .await
            .expect("user dashboard");
        let body = test_support::read_json(response).await;

        // 100% and 0% average to 50%, not the 10/40 marks ratio.
        assert_eq!(body["statistics"]["average_percentage"], 50.0);
        assert_eq!(body["statistics"]["average_score"], 5.0);
    }
}
