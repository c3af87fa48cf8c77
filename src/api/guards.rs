//! Request guards. Each one rejects with a typed [`ApiError`] before the
//! handler body runs; admin checks are layered on top of [`CurrentUser`].

use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::security::{self, Claims, TokenType};
use crate::core::state::AppState;
use crate::db::models::User;
use crate::repositories;

const INVALID_CREDENTIALS: &str = "Invalid authentication credentials";

/// Any active user holding a valid, unrevoked access token.
pub(crate) struct CurrentUser {
    pub(crate) user: User,
    pub(crate) claims: Claims,
}

/// A [`CurrentUser`] with the admin role.
pub(crate) struct CurrentAdmin(pub(crate) User);

/// An active user presenting a refresh token.
pub(crate) struct RefreshUser(pub(crate) User);

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized(INVALID_CREDENTIALS))
}

async fn app_state(parts: &mut Parts, state: &AppState) -> Result<AppState, ApiError> {
    let State(app_state) = State::<AppState>::from_request_parts(parts, state)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;
    Ok(app_state)
}

async fn load_active_user(state: &AppState, user_id: &str) -> Result<User, ApiError> {
    let user = repositories::users::find_by_id(state.db(), user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?;

    match user {
        Some(user) if user.is_active => Ok(user),
        Some(_) => Err(ApiError::Unauthorized("Account is deactivated")),
        None => Err(ApiError::Unauthorized("User not found")),
    }
}

/// Revocation is best-effort: an unreachable Redis never blocks authentication.
async fn is_revoked(state: &AppState, jti: &str) -> bool {
    match state.redis().exists(&security::revocation_key(jti)).await {
        Ok(revoked) => revoked,
        Err(err) => {
            tracing::debug!(error = %err, "Token revocation check skipped");
            false
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let app_state = app_state(parts, state).await?;
        let token = bearer_token(parts)?;

        let claims = security::verify_token(token, TokenType::Access, app_state.settings())
            .map_err(|_| ApiError::Unauthorized(INVALID_CREDENTIALS))?;

        if is_revoked(&app_state, &claims.jti).await {
            return Err(ApiError::Unauthorized("Token has been revoked"));
        }

        let user = load_active_user(&app_state, &claims.sub).await?;
        Ok(CurrentUser { user, claims })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser { user, .. } = CurrentUser::from_request_parts(parts, state).await?;

        if user.is_admin() {
            Ok(CurrentAdmin(user))
        } else {
            Err(ApiError::Forbidden("Admin access required"))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RefreshUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let app_state = app_state(parts, state).await?;
        let token = bearer_token(parts)?;

        let claims = security::verify_token(token, TokenType::Refresh, app_state.settings())
            .map_err(|_| ApiError::Unauthorized(INVALID_CREDENTIALS))?;

        let user = load_active_user(&app_state, &claims.sub).await?;
        Ok(RefreshUser(user))
    }
}
