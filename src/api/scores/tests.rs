use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::api::router::router;
use crate::core::redis::RedisHandle;
use crate::core::state::AppState;
use crate::services::notifier::Notifier;
use crate::test_support;

async fn send(app: &axum::Router, method: Method, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(test_support::json_request(method, uri, Some(token), body))
        .await
        .expect("response");
    let status = response.status();
    (status, test_support::read_json(response).await)
}

async fn count_scores(state: &AppState) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM scores").fetch_one(state.db()).await.expect("count")
}

#[tokio::test]
async fn half_right_attempt_scores_fifty_percent() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };
    let admin = test_support::insert_admin(&ctx.state, "admin1", "admin1@example.com").await;
    let student = test_support::insert_user(&ctx.state, "student1", "student1@example.com").await;
    let admin_token = test_support::bearer_token(&admin.id, ctx.state.settings());
    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());

    let (status, subject) = send(
        &ctx.app,
        Method::POST,
        "/api/subjects",
        &admin_token,
        Some(json!({ "name": "Math", "description": "Numbers" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {subject}");

    let (status, chapter) = send(
        &ctx.app,
        Method::POST,
        "/api/chapters",
        &admin_token,
        Some(json!({ "name": "Algebra", "description": "Symbols", "subject_id": subject["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {chapter}");

    let (status, quiz) = send(
        &ctx.app,
        Method::POST,
        "/api/quizzes",
        &admin_token,
        Some(json!({
            "title": "Quiz1",
            "chapter_id": chapter["id"],
            "date_of_quiz": "2025-01-15",
            "time_duration": "00:30"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {quiz}");

    let mut question_ids = Vec::new();
    for (statement, correct) in [("What is 1 + 1?", 2), ("What is 2 + 2?", 4)] {
        let (status, question) = send(
            &ctx.app,
            Method::POST,
            "/api/questions",
            &admin_token,
            Some(json!({
                "quiz_id": quiz["id"],
                "question_statement": statement,
                "option1": "1",
                "option2": "2",
                "option3": "3",
                "option4": "4",
                "correct_option": correct,
                "marks": 10
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "response: {question}");
        question_ids.push(question["id"].as_str().expect("question id").to_string());
    }

    let (status, attempt) = send(
        &ctx.app,
        Method::GET,
        &format!("/api/quiz-attempt/{}", quiz["id"].as_str().expect("quiz id")),
        &student_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {attempt}");
    assert_eq!(attempt["quiz"]["total_marks"], 20);
    assert!(attempt["questions"][0].get("correct_option").is_none());

    let mut answers = serde_json::Map::new();
    answers.insert(question_ids[0].clone(), json!(2));
    answers.insert(question_ids[1].clone(), json!(1));
    let (status, score) = send(
        &ctx.app,
        Method::POST,
        "/api/scores",
        &student_token,
        Some(json!({ "quiz_id": quiz["id"], "answers": answers, "time_taken": "00:12" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {score}");
    assert_eq!(score["total_scored"], 10);
    assert_eq!(score["total_questions"], 2);
    assert_eq!(score["percentage"], 50.0);

    let (status, listed) = send(&ctx.app, Method::GET, "/api/scores", &student_token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn sixth_attempt_is_rejected() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };
    let student = test_support::insert_user(&ctx.state, "student2", "student2@example.com").await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());
    let fixture = test_support::insert_quiz(&ctx.state, "History", &[(1, 1)]).await;
    let body = json!({
        "quiz_id": fixture.quiz_id,
        "answers": { fixture.question_ids[0].clone(): 1 },
        "time_taken": "00:05"
    });

    for _ in 0..5 {
        let (status, score) =
            send(&ctx.app, Method::POST, "/api/scores", &token, Some(body.clone())).await;
        assert_eq!(status, StatusCode::CREATED, "response: {score}");
    }

    let (status, rejected) = send(&ctx.app, Method::POST, "/api/scores", &token, Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        rejected["detail"],
        "You have reached the maximum number of attempts (5) for this quiz"
    );
    assert_eq!(count_scores(&ctx.state).await, 5);
}

#[tokio::test]
async fn invalid_submissions_store_nothing() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };
    let student = test_support::insert_user(&ctx.state, "student3", "student3@example.com").await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());
    let fixture = test_support::insert_quiz(&ctx.state, "Geography", &[(1, 1), (2, 1)]).await;
    let question = fixture.question_ids[0].clone();

    let cases = [
        (json!({ "quiz_id": fixture.quiz_id, "answers": { question.clone(): 5 }, "time_taken": "00:05" }),
         StatusCode::BAD_REQUEST),
        (json!({ "quiz_id": fixture.quiz_id, "answers": { question.clone(): 1 }, "time_taken": "5 min" }),
         StatusCode::BAD_REQUEST),
        (json!({ "quiz_id": fixture.quiz_id, "time_taken": "00:05" }), StatusCode::BAD_REQUEST),
        (json!({ "quiz_id": "missing", "answers": { question.clone(): 1 }, "time_taken": "00:05" }),
         StatusCode::NOT_FOUND),
        // An unknown quiz is reported before the answers are looked at.
        (json!({ "quiz_id": "missing", "answers": { question.clone(): 9 }, "time_taken": "7 min" }),
         StatusCode::NOT_FOUND),
    ];

    for (body, expected) in cases {
        let (status, response) = send(&ctx.app, Method::POST, "/api/scores", &token, Some(body)).await;
        assert_eq!(status, expected, "response: {response}");
    }
    assert_eq!(count_scores(&ctx.state).await, 0);
}

#[tokio::test]
async fn editing_marks_changes_past_percentages() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };
    let admin = test_support::insert_admin(&ctx.state, "admin4", "admin4@example.com").await;
    let student = test_support::insert_user(&ctx.state, "student4", "student4@example.com").await;
    let admin_token = test_support::bearer_token(&admin.id, ctx.state.settings());
    let token = test_support::bearer_token(&student.id, ctx.state.settings());
    let fixture = test_support::insert_quiz(&ctx.state, "Art", &[(1, 10), (2, 10)]).await;

    let (status, score) = send(
        &ctx.app,
        Method::POST,
        "/api/scores",
        &token,
        Some(json!({
            "quiz_id": fixture.quiz_id,
            "answers": { fixture.question_ids[0].clone(): 1, fixture.question_ids[1].clone(): 3 },
            "time_taken": "00:07"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {score}");
    assert_eq!(score["percentage"], 50.0);
    let score_id = score["id"].as_str().expect("score id").to_string();

    let (status, updated) = send(
        &ctx.app,
        Method::PUT,
        &format!("/api/questions/{}", fixture.question_ids[1]),
        &admin_token,
        Some(json!({
            "quiz_id": fixture.quiz_id,
            "question_statement": "Question number 2",
            "option1": "A",
            "option2": "B",
            "option3": "C",
            "option4": "D",
            "correct_option": 2,
            "marks": 30
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {updated}");

    let (status, reread) =
        send(&ctx.app, Method::GET, &format!("/api/scores/{score_id}"), &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reread["total_scored"], 10);
    assert_eq!(reread["total_marks"], 40);
    assert_eq!(reread["percentage"], 25.0);
}

#[tokio::test]
async fn scores_are_private_to_their_owner() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };
    let owner = test_support::insert_user(&ctx.state, "owner", "owner@example.com").await;
    let other = test_support::insert_user(&ctx.state, "other", "other@example.com").await;
    let fixture = test_support::insert_quiz(&ctx.state, "Music", &[(3, 2)]).await;
    let owner_token = test_support::bearer_token(&owner.id, ctx.state.settings());
    let other_token = test_support::bearer_token(&other.id, ctx.state.settings());

    let (_, score) = send(
        &ctx.app,
        Method::POST,
        "/api/scores",
        &owner_token,
        Some(json!({
            "quiz_id": fixture.quiz_id,
            "answers": { fixture.question_ids[0].clone(): 3 },
            "time_taken": "00:01"
        })),
    )
    .await;
    let score_id = score["id"].as_str().expect("score id");

    let (status, body) =
        send(&ctx.app, Method::GET, &format!("/api/scores/{score_id}"), &other_token, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Access denied");

    let (status, listed) = send(&ctx.app, Method::GET, "/api/scores", &other_token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn submissions_work_without_redis() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };
    let settings = ctx.state.settings().clone();
    let offline = RedisHandle::new("redis://127.0.0.1:1/0".to_string());
    let notifier = Notifier::from_settings(&settings).expect("notifier");
    let state = AppState::new(settings, ctx.state.db().clone(), offline, notifier);
    let app = router(state.clone());

    let student = test_support::insert_user(&state, "offline", "offline@example.com").await;
    let token = test_support::bearer_token(&student.id, state.settings());
    let fixture = test_support::insert_quiz(&state, "Drama", &[(2, 4)]).await;

    let (status, quizzes) = send(&app, Method::GET, "/api/quizzes", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quizzes.as_array().map(Vec::len), Some(1));

    let (status, score) = send(
        &app,
        Method::POST,
        "/api/scores",
        &token,
        Some(json!({
            "quiz_id": fixture.quiz_id,
            "answers": { fixture.question_ids[0].clone(): 2 },
            "time_taken": "00:03"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {score}");
    assert_eq!(score["percentage"], 100.0);

    let (status, dashboard) = send(&app, Method::GET, "/api/dashboard", &token, None).await;
    assert_eq!(status, StatusCode::OK, "response: {dashboard}");
    assert_eq!(dashboard["statistics"]["total_attempts"], 1);
}
