use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::api::validation::{search_term, validate_payload};
use crate::core::cache::{Mutation, Namespace, SUBJECT_LIST_TTL};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Subject;
use crate::repositories;
use crate::schemas::catalog::{SubjectListQuery, SubjectPayload, SubjectResponse};
use crate::schemas::MessageResponse;

const SUBJECT_MISSING: &str = "Subject does not exist.";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subjects).post(create_subject))
        .route("/:id", get(get_subject).put(update_subject).delete(delete_subject))
}

async fn list_subjects(
    State(state): State<AppState>,
    Query(params): Query<SubjectListQuery>,
) -> Result<Json<Vec<SubjectResponse>>, ApiError> {
    let search = search_term(params.search.as_deref());
    let key = state
        .cache()
        .key(Namespace::Subjects, &format!("list:{}", search.unwrap_or_default().to_lowercase()));
    if let Some(cached) = state.cache().get::<Vec<SubjectResponse>>(&key).await {
        return Ok(Json(cached));
    }

    let subjects = repositories::subjects::list(state.db(), search)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list subjects"))?;
    let response: Vec<SubjectResponse> =
        subjects.into_iter().map(SubjectResponse::from_db).collect();

    state.cache().set(&key, &response, SUBJECT_LIST_TTL).await;
    Ok(Json(response))
}

async fn get_subject(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SubjectResponse>, ApiError> {
    let subject = load(&state, &id).await?;
    Ok(Json(SubjectResponse::from_db(subject)))
}

async fn create_subject(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<SubjectPayload>,
) -> Result<(StatusCode, Json<SubjectResponse>), ApiError> {
    validate_payload(&payload)?;
    ensure_name_free(&state, &payload.name, None).await?;

    let id = Uuid::new_v4().to_string();
    repositories::subjects::create(
        state.db(),
        repositories::subjects::CreateSubject {
            id: &id,
            name: &payload.name,
            description: &payload.description,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Failed to create subject"))?;

    state.cache().invalidate_for(Mutation::Subject).await;
    tracing::info!(admin_id = %admin.id, subject_id = %id, action = "subject_create", "Subject created");

    let subject = load(&state, &id).await?;
    Ok((StatusCode::CREATED, Json(SubjectResponse::from_db(subject))))
}

async fn update_subject(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<SubjectPayload>,
) -> Result<Json<SubjectResponse>, ApiError> {
    validate_payload(&payload)?;
    ensure_exists(&state, &id).await?;
    ensure_name_free(&state, &payload.name, Some(&id)).await?;

    repositories::subjects::update(
        state.db(),
        &id,
        repositories::subjects::UpdateSubject {
            name: Some(&payload.name),
            description: Some(&payload.description),
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Failed to update subject"))?;

    state.cache().invalidate_for(Mutation::Subject).await;
    tracing::info!(admin_id = %admin.id, subject_id = %id, action = "subject_update", "Subject updated");

    let subject = load(&state, &id).await?;
    Ok(Json(SubjectResponse::from_db(subject)))
}

async fn delete_subject(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let removed = repositories::subjects::delete(state.db(), &id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete subject"))?;
    if removed == 0 {
        return Err(ApiError::NotFound(SUBJECT_MISSING.to_string()));
    }

    state.cache().invalidate_for(Mutation::Subject).await;
    tracing::info!(admin_id = %admin.id, subject_id = %id, action = "subject_delete", "Subject deleted");
    Ok(Json(MessageResponse::new("Subject deleted successfully")))
}

async fn ensure_exists(state: &AppState, id: &str) -> Result<(), ApiError> {
    let exists = repositories::subjects::exists(state.db(), id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load subject"))?;
    if exists {
        Ok(())
    } else {
        Err(ApiError::NotFound(SUBJECT_MISSING.to_string()))
    }
}

async fn ensure_name_free(state: &AppState, name: &str, except_id: Option<&str>) -> Result<(), ApiError> {
    let taken = repositories::subjects::name_taken(state.db(), name, except_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check subject name"))?;
    if taken {
        Err(ApiError::Conflict("Subject already exists.".to_string()))
    } else {
        Ok(())
    }
}

async fn load(state: &AppState, id: &str) -> Result<Subject, ApiError> {
    repositories::subjects::find_by_id(state.db(), id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load subject"))?
        .ok_or_else(|| ApiError::NotFound(SUBJECT_MISSING.to_string()))
}
