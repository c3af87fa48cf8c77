use axum::body::to_bytes;
use axum::http::{header, Method, StatusCode};
use tower::ServiceExt;

use crate::core::time::primitive_now_utc;
use crate::repositories::jobs;
use crate::tasks::jobs::execute;
use crate::test_support;

async fn send(
    ctx: &test_support::TestContext,
    method: Method,
    uri: &str,
    token: &str,
) -> axum::response::Response {
    ctx.app
        .clone()
        .oneshot(test_support::json_request(method, uri, Some(token), None))
        .await
        .expect("request")
}

/// Queues an export through the API, runs it, and returns the generated filename.
async fn run_export(ctx: &test_support::TestContext, uri: &str, token: &str) -> String {
    let response = send(ctx, Method::POST, uri, token).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let accepted = test_support::read_json(response).await;
    let job_id = accepted["job_id"].as_str().expect("job id").to_string();

    let claimed = jobs::claim_next(ctx.state.db(), primitive_now_utc())
        .await
        .expect("claim")
        .expect("queued job");
    assert_eq!(claimed.id, job_id);
    execute(&ctx.state, claimed).await;

    let done = jobs::find_by_id(ctx.state.db(), &job_id).await.expect("load").expect("job");
    let result = done.result.expect("result").0;
    result["filename"].as_str().expect("filename").to_string()
}

#[tokio::test]
async fn user_export_downloads_for_owner_only() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };
    let owner = test_support::insert_user(&ctx.state, "owner", "owner@example.com").await;
    let other = test_support::insert_user(&ctx.state, "other", "other@example.com").await;
    let admin = test_support::insert_admin(&ctx.state, "admin1", "admin1@example.com").await;
    let owner_token = test_support::bearer_token(&owner.id, ctx.state.settings());
    let other_token = test_support::bearer_token(&other.id, ctx.state.settings());
    let admin_token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let filename = run_export(&ctx, "/api/export/user-csv", &owner_token).await;
    assert!(filename.starts_with(&format!("quiz_history_{}_", owner.id)));
    let uri = format!("/api/export/download/{filename}");

    let response = send(&ctx, Method::GET, &uri, &owner_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.contains(&filename));
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&body).starts_with("quiz_id,quiz_title"));

    let response = send(&ctx, Method::GET, &uri, &other_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&ctx, Method::GET, &uri, &admin_token).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_export_requires_admin() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };
    let student = test_support::insert_user(&ctx.state, "student1", "student1@example.com").await;
    let admin = test_support::insert_admin(&ctx.state, "admin1", "admin1@example.com").await;
    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());
    let admin_token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let response = send(&ctx, Method::POST, "/api/export/admin-csv", &student_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let filename = run_export(&ctx, "/api/export/admin-csv", &admin_token).await;
    assert!(filename.starts_with("users_summary_"));

    let response =
        send(&ctx, Method::GET, &format!("/api/export/download/{filename}"), &student_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn download_rejects_unknown_and_unsafe_names() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };
    let student = test_support::insert_user(&ctx.state, "student1", "student1@example.com").await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let response = send(&ctx, Method::GET, "/api/export/download/.hidden.csv", &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = test_support::read_json(response).await;
    assert_eq!(body["detail"], "Invalid filename");

    let response = send(&ctx, Method::GET, "/api/export/download/notes.txt", &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response =
        send(&ctx, Method::GET, "/api/export/download/quiz_history_missing.csv", &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
