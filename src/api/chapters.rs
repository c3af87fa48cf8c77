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
use crate::db::models::Chapter;
use crate::repositories;
use crate::schemas::catalog::{ChapterListQuery, ChapterPayload, ChapterResponse};
use crate::schemas::MessageResponse;

const CHAPTER_MISSING: &str = "Chapter does not exist.";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_chapters).post(create_chapter))
        .route("/:id", get(get_chapter).put(update_chapter).delete(delete_chapter))
}

async fn list_chapters(
    State(state): State<AppState>,
    Query(params): Query<ChapterListQuery>,
) -> Result<Json<Vec<ChapterResponse>>, ApiError> {
    let search = search_term(params.search.as_deref());
    let subject_id = search_term(params.subject_id.as_deref());
    let key = state.cache().key(
        Namespace::Chapters,
        &format!(
            "list:{}:{}",
            subject_id.unwrap_or_default(),
            search.unwrap_or_default().to_lowercase()
        ),
    );
    if let Some(cached) = state.cache().get::<Vec<ChapterResponse>>(&key).await {
        return Ok(Json(cached));
    }

    let chapters = repositories::chapters::list(state.db(), search, subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list chapters"))?;
    let response: Vec<ChapterResponse> =
        chapters.into_iter().map(ChapterResponse::from_db).collect();

    state.cache().set(&key, &response, SUBJECT_LIST_TTL).await;
    Ok(Json(response))
}

async fn get_chapter(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChapterResponse>, ApiError> {
    let chapter = load(&state, &id).await?;
    Ok(Json(ChapterResponse::from_db(chapter)))
}

async fn create_chapter(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<ChapterPayload>,
) -> Result<(StatusCode, Json<ChapterResponse>), ApiError> {
    validate_payload(&payload)?;
    ensure_subject(&state, &payload.subject_id).await?;
    ensure_name_free(&state, &payload, None).await?;

    let id = Uuid::new_v4().to_string();
    repositories::chapters::create(
        state.db(),
        repositories::chapters::CreateChapter {
            id: &id,
            subject_id: &payload.subject_id,
            name: &payload.name,
            description: &payload.description,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Failed to create chapter"))?;

    state.cache().invalidate_for(Mutation::Chapter).await;
    tracing::info!(admin_id = %admin.id, chapter_id = %id, action = "chapter_create", "Chapter created");

    let chapter = load(&state, &id).await?;
    Ok((StatusCode::CREATED, Json(ChapterResponse::from_db(chapter))))
}

async fn update_chapter(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ChapterPayload>,
) -> Result<Json<ChapterResponse>, ApiError> {
    validate_payload(&payload)?;
    load(&state, &id).await?;
    ensure_subject(&state, &payload.subject_id).await?;
    ensure_name_free(&state, &payload, Some(&id)).await?;

    repositories::chapters::update(
        state.db(),
        &id,
        repositories::chapters::UpdateChapter {
            subject_id: Some(&payload.subject_id),
            name: Some(&payload.name),
            description: Some(&payload.description),
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Failed to update chapter"))?;

    state.cache().invalidate_for(Mutation::Chapter).await;
    tracing::info!(admin_id = %admin.id, chapter_id = %id, action = "chapter_update", "Chapter updated");

    let chapter = load(&state, &id).await?;
    Ok(Json(ChapterResponse::from_db(chapter)))
}

async fn delete_chapter(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let removed = repositories::chapters::delete(state.db(), &id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete chapter"))?;
    if removed == 0 {
        return Err(ApiError::NotFound(CHAPTER_MISSING.to_string()));
    }

    state.cache().invalidate_for(Mutation::Chapter).await;
    tracing::info!(admin_id = %admin.id, chapter_id = %id, action = "chapter_delete", "Chapter deleted");
    Ok(Json(MessageResponse::new("Chapter deleted successfully")))
}

async fn ensure_subject(state: &AppState, subject_id: &str) -> Result<(), ApiError> {
    let exists = repositories::subjects::exists(state.db(), subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load subject"))?;
    if exists {
        Ok(())
    } else {
        Err(ApiError::NotFound("Subject not found".to_string()))
    }
}

async fn ensure_name_free(
    state: &AppState,
    payload: &ChapterPayload,
    except_id: Option<&str>,
) -> Result<(), ApiError> {
    let taken =
        repositories::chapters::name_taken(state.db(), &payload.subject_id, &payload.name, except_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check chapter name"))?;
    if taken {
        Err(ApiError::Conflict("Chapter with this name already exists in this subject.".to_string()))
    } else {
        Ok(())
    }
}

async fn load(state: &AppState, id: &str) -> Result<Chapter, ApiError> {
    repositories::chapters::find_by_id(state.db(), id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load chapter"))?
        .ok_or_else(|| ApiError::NotFound(CHAPTER_MISSING.to_string()))
}
