use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

fn registration(username: &str, email: &str) -> serde_json::Value {
    json!({
        "username": username,
        "email": email,
        "password": "secret-pass",
        "full_name": "Riley Learner",
        "qualification": "BSc",
        "date_of_birth": "2001-04-12"
    })
}

#[tokio::test]
async fn register_login_and_profile() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(registration("riley", "riley@example.com")),
        ))
        .await
        .expect("register");
    let status = response.status();
    let registered = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {registered}");
    assert_eq!(registered["message"], "User registered successfully");
    assert_eq!(registered["user"]["roles"], json!(["user"]));
    assert_eq!(registered["user"]["is_admin"], false);
    assert_eq!(registered["user"]["date_of_birth"], "2001-04-12");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "riley@example.com", "password": "secret-pass" })),
        ))
        .await
        .expect("login");
    let status = response.status();
    let login = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {login}");
    assert_eq!(login["message"], "Login successful");
    assert_eq!(login["token_type"], "bearer");
    let access_token = login["access_token"].as_str().expect("access token").to_string();
    let refresh_token = login["refresh_token"].as_str().expect("refresh token").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/auth/profile",
            Some(&access_token),
            None,
        ))
        .await
        .expect("profile");
    let status = response.status();
    let profile = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {profile}");
    assert_eq!(profile["user"]["username"], "riley");
    assert_eq!(profile["user"]["qualification"], "BSc");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/auth/refresh",
            Some(&refresh_token),
            None,
        ))
        .await
        .expect("refresh");
    let status = response.status();
    let refreshed = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {refreshed}");
    assert!(refreshed["access_token"].as_str().is_some());
}

#[tokio::test]
async fn register_rejects_missing_fields_and_duplicates() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };

    let mut missing = registration("sam", "sam@example.com");
    missing.as_object_mut().expect("object").remove("password");
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::POST, "/api/auth/register", None, Some(missing)))
        .await
        .expect("register");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = test_support::read_json(response).await;
    assert_eq!(body["detail"], "password is required");

    test_support::insert_user(&ctx.state, "sam", "sam-existing@example.com").await;
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(registration("sam", "sam@example.com")),
        ))
        .await
        .expect("register duplicate");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = test_support::read_json(response).await;
    assert_eq!(body["detail"], "Username already exists");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(registration("sammy", "sam-existing@example.com")),
        ))
        .await
        .expect("register duplicate email");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = test_support::read_json(response).await;
    assert_eq!(body["detail"], "Email already exists");
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };
    test_support::insert_user(&ctx.state, "quinn", "quinn@example.com").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "quinn", "password": "wrong-password" })),
        ))
        .await
        .expect("login");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = test_support::read_json(response).await;
    assert_eq!(body["detail"], "Invalid credentials");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "quinn" })),
        ))
        .await
        .expect("login");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_revokes_the_access_token() {
    let Some(ctx) = test_support::setup_test_context().await else {
        return;
    };
    if !ctx.state.redis().is_connected().await {
        return;
    }

    let user = test_support::insert_user(&ctx.state, "morgan", "morgan@example.com").await;
    let token = test_support::bearer_token(&user.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::POST, "/api/auth/logout", Some(&token), None))
        .await
        .expect("logout");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/auth/profile", Some(&token), None))
        .await
        .expect("profile");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = test_support::read_json(response).await;
    assert_eq!(body["detail"], "Token has been revoked");
}
