use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::api::validation::{search_term, validate_date, validate_hh_mm, validate_payload};
use crate::core::cache::{Mutation, Namespace, QUIZ_LIST_TTL};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Quiz;
use crate::repositories;
use crate::repositories::quizzes::QuizFilter;
use crate::schemas::quiz::{QuizListQuery, QuizPayload, QuizResponse};
use crate::schemas::MessageResponse;

const QUIZ_MISSING: &str = "Quiz not found";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_quizzes).post(create_quiz))
        .route("/:id", get(get_quiz).put(update_quiz).delete(delete_quiz))
}

async fn list_quizzes(
    State(state): State<AppState>,
    Query(params): Query<QuizListQuery>,
) -> Result<Json<Vec<QuizResponse>>, ApiError> {
    let filter = QuizFilter {
        search: search_term(params.search.as_deref()),
        chapter_id: search_term(params.chapter_id.as_deref()),
        is_active: params.is_active,
    };
    let key = state.cache().key(
        Namespace::Quizzes,
        &format!(
            "list:{}:{}:{}",
            filter.chapter_id.unwrap_or_default(),
            filter.is_active.map(|active| active.to_string()).unwrap_or_default(),
            filter.search.unwrap_or_default().to_lowercase()
        ),
    );
    if let Some(cached) = state.cache().get::<Vec<QuizResponse>>(&key).await {
        return Ok(Json(cached));
    }

    let quizzes = repositories::quizzes::list(state.db(), filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list quizzes"))?;
    let response: Vec<QuizResponse> = quizzes.into_iter().map(QuizResponse::from_db).collect();

    state.cache().set(&key, &response, QUIZ_LIST_TTL).await;
    Ok(Json(response))
}

async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QuizResponse>, ApiError> {
    let quiz = load(&state, &id).await?;
    Ok(Json(QuizResponse::from_db(quiz)))
}

async fn create_quiz(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<QuizPayload>,
) -> Result<(StatusCode, Json<QuizResponse>), ApiError> {
    validate_payload(&payload)?;
    let date_of_quiz = validate_date(&payload.date_of_quiz)?;
    let time_duration = validate_hh_mm(&payload.time_duration)?;
    ensure_chapter(&state, &payload.chapter_id).await?;

    let id = Uuid::new_v4().to_string();
    repositories::quizzes::create(
        state.db(),
        repositories::quizzes::CreateQuiz {
            id: &id,
            chapter_id: &payload.chapter_id,
            title: &payload.title,
            date_of_quiz,
            time_duration: &time_duration,
            remarks: &payload.remarks,
            is_active: payload.is_active.unwrap_or(true),
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Failed to create quiz"))?;

    state.cache().invalidate_for(Mutation::Quiz).await;
    tracing::info!(admin_id = %admin.id, quiz_id = %id, action = "quiz_create", "Quiz created");

    let quiz = load(&state, &id).await?;
    Ok((StatusCode::CREATED, Json(QuizResponse::from_db(quiz))))
}

async fn update_quiz(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<QuizPayload>,
) -> Result<Json<QuizResponse>, ApiError> {
    validate_payload(&payload)?;
    let date_of_quiz = validate_date(&payload.date_of_quiz)?;
    let time_duration = validate_hh_mm(&payload.time_duration)?;
    load(&state, &id).await?;
    ensure_chapter(&state, &payload.chapter_id).await?;

    repositories::quizzes::update(
        state.db(),
        &id,
        repositories::quizzes::UpdateQuiz {
            chapter_id: Some(&payload.chapter_id),
            title: Some(&payload.title),
            date_of_quiz: Some(date_of_quiz),
            time_duration: Some(&time_duration),
            remarks: Some(&payload.remarks),
            is_active: payload.is_active,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Failed to update quiz"))?;

    state.cache().invalidate_for(Mutation::Quiz).await;
    tracing::info!(admin_id = %admin.id, quiz_id = %id, action = "quiz_update", "Quiz updated");

    let quiz = load(&state, &id).await?;
    Ok(Json(QuizResponse::from_db(quiz)))
}

async fn delete_quiz(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let removed = repositories::quizzes::delete(state.db(), &id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete quiz"))?;
    if removed == 0 {
        return Err(ApiError::NotFound(QUIZ_MISSING.to_string()));
    }

    state.cache().invalidate_for(Mutation::Quiz).await;
    tracing::info!(admin_id = %admin.id, quiz_id = %id, action = "quiz_delete", "Quiz deleted");
    Ok(Json(MessageResponse::new("Quiz deleted successfully")))
}

async fn ensure_chapter(state: &AppState, chapter_id: &str) -> Result<(), ApiError> {
    let exists = repositories::chapters::exists(state.db(), chapter_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load chapter"))?;
    if exists {
        Ok(())
    } else {
        Err(ApiError::BadRequest("Chapter not found".to_string()))
    }
}

async fn load(state: &AppState, id: &str) -> Result<Quiz, ApiError> {
    repositories::quizzes::find_by_id(state.db(), id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load quiz"))?
        .ok_or_else(|| ApiError::NotFound(QUIZ_MISSING.to_string()))
}

#[cfg(test)]
mod tests;
