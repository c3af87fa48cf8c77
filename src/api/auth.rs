use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentUser, RefreshUser};
use crate::api::validation::{validate_date, validate_password_len, validate_payload};
use crate::core::cache::Mutation;
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::USER_ROLE;
use crate::repositories;
use crate::schemas::auth::{AccessTokenResponse, ProfileResponse, TokenResponse};
use crate::schemas::user::{LoginRequest, RegisterRequest, UserResponse};
use crate::schemas::MessageResponse;

/// Max attempts per window for login and registration.
const AUTH_RATE_LIMIT: u64 = 10;
/// Rate limit window in seconds.
const AUTH_RATE_WINDOW_SECONDS: u64 = 60;

const INVALID_LOGIN: &str = "Invalid credentials";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/profile", get(profile))
}

async fn check_rate_limit(state: &AppState, action: &str, subject: &str) -> Result<(), ApiError> {
    let rate_key = format!("rl:{action}:{}", subject.to_lowercase());
    let allowed = state
        .redis()
        .rate_limit(&rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if allowed {
        Ok(())
    } else {
        Err(ApiError::TooManyRequests("Too many attempts, try again later"))
    }
}

fn issue_tokens(state: &AppState, user: User, message: &'static str) -> Result<TokenResponse, ApiError> {
    let access_token = security::create_access_token(&user.id, state.settings())
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;
    let refresh_token = security::create_refresh_token(&user.id, state.settings())
        .map_err(|e| ApiError::internal(e, "Failed to create refresh token"))?;

    Ok(TokenResponse {
        message,
        access_token,
        refresh_token,
        token_type: "bearer",
        user: UserResponse::from_db(user),
    })
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest("Username and password required".to_string()));
    }

    check_rate_limit(&state, "login", &payload.username).await?;

    let user = repositories::users::find_by_login(state.db(), &payload.username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized(INVALID_LOGIN))?;

    let verified = security::verify_password(&payload.password, &user.password_hash)
        .map_err(|_| ApiError::Unauthorized(INVALID_LOGIN))?;
    if !verified {
        tracing::info!(username = %payload.username, "Rejected login");
        return Err(ApiError::Unauthorized(INVALID_LOGIN));
    }

    if !user.is_active {
        return Err(ApiError::BadRequest("Inactive user".to_string()));
    }

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(issue_tokens(&state, user, "Login successful")?))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    if let Some(field) = payload.missing_field() {
        return Err(ApiError::BadRequest(format!("{field} is required")));
    }
    validate_payload(&payload)?;
    validate_password_len(&payload.password)?;
    let date_of_birth = payload.date_of_birth.as_deref().map(validate_date).transpose()?;

    check_rate_limit(&state, "register", &payload.username).await?;

    let username_taken = repositories::users::exists_by_username(state.db(), &payload.username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
    if username_taken {
        return Err(ApiError::Conflict("Username already exists".to_string()));
    }
    let email_taken = repositories::users::exists_by_email(state.db(), &payload.email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
    if email_taken {
        return Err(ApiError::Conflict("Email already exists".to_string()));
    }

    let password_hash = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let id = Uuid::new_v4().to_string();
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to begin transaction"))?;
    repositories::users::create(
        &mut *tx,
        repositories::users::CreateUser {
            id: &id,
            username: &payload.username,
            email: &payload.email,
            password_hash,
            full_name: &payload.full_name,
            qualification: payload.qualification.as_deref(),
            date_of_birth,
            is_active: true,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Failed to create user"))?;
    repositories::roles::assign(&mut *tx, &id, USER_ROLE)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to assign role"))?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit registration"))?;

    state.cache().invalidate_for(Mutation::User).await;

    let user = repositories::users::find_by_id(state.db(), &id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or_else(|| ApiError::Internal("Registered user disappeared".to_string()))?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");
    Ok((StatusCode::CREATED, Json(issue_tokens(&state, user, "User registered successfully")?)))
}

async fn refresh(
    State(state): State<AppState>,
    RefreshUser(user): RefreshUser,
) -> Result<Json<AccessTokenResponse>, ApiError> {
    let access_token = security::create_access_token(&user.id, state.settings())
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;
    Ok(Json(AccessTokenResponse { access_token, token_type: "bearer" }))
}

/// Revokes the presented access token until it would have expired anyway.
async fn logout(
    State(state): State<AppState>,
    CurrentUser { user, claims }: CurrentUser,
) -> Json<MessageResponse> {
    let key = security::revocation_key(&claims.jti);
    if let Err(err) = state.redis().set_ex(&key, "1", claims.remaining_seconds()).await {
        tracing::warn!(user_id = %user.id, error = %err, "Token revocation not stored");
    }

    tracing::info!(user_id = %user.id, "User logged out");
    Json(MessageResponse::new("Logout successful"))
}

async fn profile(CurrentUser { user, .. }: CurrentUser) -> Json<ProfileResponse> {
    Json(ProfileResponse { user: UserResponse::from_db(user) })
}

#[cfg(test)]
mod tests;
