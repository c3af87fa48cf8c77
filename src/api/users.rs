use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::api::validation::{search_term, validate_date, validate_payload};
use crate::core::cache::{Mutation, Namespace, USER_PROFILE_TTL};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::repositories;
use crate::schemas::user::{UserListQuery, UserResponse, UserUpdate};
use crate::schemas::MessageResponse;

const USER_MISSING: &str = "User not found";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

async fn list_users(
    CurrentAdmin(_): CurrentAdmin,
    State(state): State<AppState>,
    Query(params): Query<UserListQuery>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = repositories::users::list(
        state.db(),
        repositories::users::ListUsers {
            search: search_term(params.search.as_deref()),
            role: search_term(params.role.as_deref()),
            skip: params.skip,
            limit: params.limit,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list users"))?;

    Ok(Json(users.into_iter().map(UserResponse::from_db).collect()))
}

async fn get_user(
    CurrentAdmin(_): CurrentAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let key = state.cache().key(Namespace::Users, &id);
    if let Some(cached) = state.cache().get::<UserResponse>(&key).await {
        return Ok(Json(cached));
    }

    let response = UserResponse::from_db(load(&state, &id).await?);
    state.cache().set(&key, &response, USER_PROFILE_TTL).await;
    Ok(Json(response))
}

async fn update_user(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UserUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    validate_payload(&payload)?;
    let date_of_birth = payload.date_of_birth.as_deref().map(validate_date).transpose()?;
    load(&state, &id).await?;

    repositories::users::update(
        state.db(),
        &id,
        repositories::users::UpdateUser {
            full_name: payload.full_name,
            qualification: payload.qualification,
            date_of_birth,
            is_active: payload.is_active,
            password_hash: None,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Failed to update user"))?;

    state.cache().invalidate_for(Mutation::User).await;
    tracing::info!(admin_id = %admin.id, user_id = %id, action = "user_update", "User updated");

    Ok(Json(UserResponse::from_db(load(&state, &id).await?)))
}

async fn delete_user(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    if admin.id == id {
        return Err(ApiError::BadRequest("Cannot delete your own account.".to_string()));
    }

    let removed = repositories::users::delete(state.db(), &id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete user"))?;
    if removed == 0 {
        return Err(ApiError::NotFound(USER_MISSING.to_string()));
    }

    state.cache().invalidate_for(Mutation::User).await;
    tracing::info!(admin_id = %admin.id, user_id = %id, action = "user_delete", "User deleted");
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

async fn load(state: &AppState, id: &str) -> Result<User, ApiError> {
    repositories::users::find_by_id(state.db(), id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or_else(|| ApiError::NotFound(USER_MISSING.to_string()))
}

#[cfg(test)]
mod tests;
