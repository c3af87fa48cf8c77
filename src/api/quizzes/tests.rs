use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

#[tokio::test]
async fn admin_creates_and_updates_quiz() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };
    let admin = test_support::insert_admin(&ctx.state, "admin1", "admin1@example.com").await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());
    let fixture = test_support::insert_quiz(&ctx.state, "Math", &[]).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/quizzes",
            Some(&token),
            Some(json!({
                "title": "Algebra Quiz",
                "chapter_id": fixture.chapter_id,
                "date_of_quiz": "2025-03-01",
                "time_duration": "1:30",
                "remarks": "Bring a pencil"
            })),
        ))
        .await
        .expect("create quiz");
    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["time_duration"], "01:30");
    assert_eq!(created["is_active"], true);
    assert_eq!(created["subject_name"], "Math");
    assert_eq!(created["question_count"], 0);
    let quiz_id = created["id"].as_str().expect("quiz id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/quizzes/{quiz_id}"),
            Some(&token),
            Some(json!({
                "title": "Algebra Quiz",
                "chapter_id": fixture.chapter_id,
                "date_of_quiz": "2025-03-02",
                "time_duration": "00:45",
                "is_active": false
            })),
        ))
        .await
        .expect("update quiz");
    let status = response.status();
    let updated = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {updated}");
    assert_eq!(updated["is_active"], false);
    assert_eq!(updated["date_of_quiz"], "2025-03-02");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/quizzes?chapter_id={}&is_active=true", fixture.chapter_id),
            None,
            None,
        ))
        .await
        .expect("list quizzes");
    assert_eq!(response.status(), StatusCode::OK);
    let listed = test_support::read_json(response).await;
    let ids: Vec<&str> =
        listed.as_array().expect("array").iter().filter_map(|quiz| quiz["id"].as_str()).collect();
    assert_eq!(ids, vec![fixture.quiz_id.as_str()]);
}

#[tokio::test]
async fn quiz_payload_is_validated() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };
    let admin = test_support::insert_admin(&ctx.state, "admin2", "admin2@example.com").await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());
    let fixture = test_support::insert_quiz(&ctx.state, "Biology", &[]).await;

    let cases = [
        (json!({ "title": "Cells", "chapter_id": fixture.chapter_id, "date_of_quiz": "2025-13-01", "time_duration": "00:30" }),
         "Invalid date format. Use YYYY-MM-DD"),
        (json!({ "title": "Cells", "chapter_id": fixture.chapter_id, "date_of_quiz": "2025-01-01", "time_duration": "25:00" }),
         "Invalid time values"),
        (json!({ "title": "Cells", "chapter_id": "nope", "date_of_quiz": "2025-01-01", "time_duration": "00:30" }),
         "Chapter not found"),
    ];

    for (payload, detail) in cases {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::POST, "/api/quizzes", Some(&token), Some(payload)))
            .await
            .expect("create quiz");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = test_support::read_json(response).await;
        assert_eq!(body["detail"], detail);
    }
}
