use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::test_support;

#[tokio::test]
async fn admin_can_list_and_update_users() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };
    let admin = test_support::insert_admin(&ctx.state, "admin001", "admin001@example.com").await;
    let student = test_support::insert_user(&ctx.state, "student123", "student123@example.com").await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, "/api/users?role=user", Some(&token), None))
        .await
        .expect("list users");
    assert_eq!(response.status(), StatusCode::OK);
    let listed = test_support::read_json(response).await;
    let usernames: Vec<&str> =
        listed.as_array().expect("array").iter().filter_map(|u| u["username"].as_str()).collect();
    assert_eq!(usernames, vec!["student123"]);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/users/{}", student.id),
            Some(&token),
            Some(json!({ "full_name": "Updated Student", "is_active": false, "date_of_birth": "2000-01-31" })),
        ))
        .await
        .expect("update user");
    let status = response.status();
    let updated = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {updated}");
    assert_eq!(updated["full_name"], "Updated Student");
    assert_eq!(updated["is_active"], false);
    assert_eq!(updated["date_of_birth"], "2000-01-31");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/users/{}", student.id),
            Some(&token),
            None,
        ))
        .await
        .expect("get user");
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = test_support::read_json(response).await;
    assert_eq!(fetched["full_name"], "Updated Student");
}

#[tokio::test]
async fn admin_cannot_delete_self_but_can_delete_others() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };
    let admin = test_support::insert_admin(&ctx.state, "admin002", "admin002@example.com").await;
    let student = test_support::insert_user(&ctx.state, "student456", "student456@example.com").await;
    let fixture = test_support::insert_quiz(&ctx.state, "Law", &[(1, 1)]).await;
    repositories::scores::create(
        ctx.state.db(),
        repositories::scores::CreateScore {
            id: "score-law",
            user_id: &student.id,
            quiz_id: &fixture.quiz_id,
            time_stamp_of_attempt: primitive_now_utc(),
            total_scored: 1,
            total_questions: 1,
            time_taken: "00:02",
        },
    )
    .await
    .expect("insert score");
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/users/{}", admin.id),
            Some(&token),
            None,
        ))
        .await
        .expect("delete self");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = test_support::read_json(response).await;
    assert_eq!(body["detail"], "Cannot delete your own account.");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/users/{}", student.id),
            Some(&token),
            None,
        ))
        .await
        .expect("delete student");
    assert_eq!(response.status(), StatusCode::OK);

    let remaining = repositories::scores::list(ctx.state.db(), Some(&student.id), None)
        .await
        .expect("list scores");
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn students_cannot_manage_users() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };
    let student = test_support::insert_user(&ctx.state, "student789", "student789@example.com").await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/users", Some(&token), None))
        .await
        .expect("list users");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
