use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

fn question_body(quiz_id: &str, statement: &str, correct_option: i32) -> serde_json::Value {
    json!({
        "quiz_id": quiz_id,
        "question_statement": statement,
        "option1": "Red",
        "option2": "Blue",
        "correct_option": correct_option,
        "marks": 2
    })
}

#[tokio::test]
async fn question_rules_are_enforced() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };
    let admin = test_support::insert_admin(&ctx.state, "admin1", "admin1@example.com").await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());
    let fixture = test_support::insert_quiz(&ctx.state, "Art", &[]).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/questions",
            Some(&token),
            Some(question_body(&fixture.quiz_id, "Colour of the sky?", 2)),
        ))
        .await
        .expect("create question");
    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["correct_option"], 2);
    assert_eq!(created["option3"], serde_json::Value::Null);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/questions",
            Some(&token),
            Some(question_body(&fixture.quiz_id, "Colour of the sky?", 1)),
        ))
        .await
        .expect("duplicate question");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/questions",
            Some(&token),
            Some(question_body(&fixture.quiz_id, "Colour of grass?", 3)),
        ))
        .await
        .expect("unpopulated option");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = test_support::read_json(response).await;
    assert_eq!(body["detail"], "Correct option 3 is not available. Only 2 options provided.");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/questions",
            Some(&token),
            Some(question_body("no-such-quiz", "Colour of grass?", 1)),
        ))
        .await
        .expect("missing quiz");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/questions?quiz_id={}", fixture.quiz_id),
            Some(&token),
            None,
        ))
        .await
        .expect("list questions");
    assert_eq!(response.status(), StatusCode::OK);
    let listed = test_support::read_json(response).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn students_cannot_read_answer_keys() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };
    let student = test_support::insert_user(&ctx.state, "student1", "student1@example.com").await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());
    let fixture = test_support::insert_quiz(&ctx.state, "Music", &[(1, 1)]).await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/questions/{}", fixture.question_ids[0]),
            Some(&token),
            None,
        ))
        .await
        .expect("get question");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn oversized_marks_are_rejected() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };
    let admin = test_support::insert_admin(&ctx.state, "admin1", "admin1@example.com").await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());
    let fixture = test_support::insert_quiz(&ctx.state, "Art", &[]).await;

    let mut body = question_body(&fixture.quiz_id, "Colour of the sky?", 2);
    body["marks"] = json!(i32::MAX);
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::POST, "/api/questions", Some(&token), Some(body)))
        .await
        .expect("create question");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let detail = test_support::read_json(response).await;
    assert!(detail["detail"].as_str().unwrap_or_default().contains("marks must be between 1 and 1000"));

    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
        .fetch_one(ctx.state.db())
        .await
        .expect("count questions");
    assert_eq!(stored, 0);

    let rejected = sqlx::query(
        "INSERT INTO questions (id, quiz_id, question_statement, option1, option2, correct_option,
                                marks, created_at, updated_at)
         VALUES ('q-big', $1, 'Too heavy', 'A', 'B', 1, 1001, NOW(), NOW())",
    )
    .bind(&fixture.quiz_id)
    .execute(ctx.state.db())
    .await;
    assert!(rejected.is_err());
}
