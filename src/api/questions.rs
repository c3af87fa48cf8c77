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
use crate::core::cache::{Mutation, Namespace, QUIZ_LIST_TTL};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Question;
use crate::repositories;
use crate::repositories::questions::QuestionFields;
use crate::schemas::quiz::{QuestionListQuery, QuestionPayload, QuestionResponse};
use crate::schemas::MessageResponse;

const QUESTION_MISSING: &str = "Question not found";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_questions).post(create_question))
        .route("/:id", get(get_question).put(update_question).delete(delete_question))
}

async fn list_questions(
    CurrentAdmin(_): CurrentAdmin,
    State(state): State<AppState>,
    Query(params): Query<QuestionListQuery>,
) -> Result<Json<Vec<QuestionResponse>>, ApiError> {
    let quiz_id = search_term(params.quiz_id.as_deref());
    let search = search_term(params.search.as_deref());
    let key = state.cache().key(
        Namespace::Questions,
        &format!("list:{}:{}", quiz_id.unwrap_or_default(), search.unwrap_or_default().to_lowercase()),
    );
    if let Some(cached) = state.cache().get::<Vec<QuestionResponse>>(&key).await {
        return Ok(Json(cached));
    }

    let questions = repositories::questions::list(state.db(), quiz_id, search)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list questions"))?;
    let response: Vec<QuestionResponse> =
        questions.into_iter().map(QuestionResponse::from_db).collect();

    state.cache().set(&key, &response, QUIZ_LIST_TTL).await;
    Ok(Json(response))
}

async fn get_question(
    CurrentAdmin(_): CurrentAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let question = load(&state, &id).await?;
    Ok(Json(QuestionResponse::from_db(question)))
}

async fn create_question(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<QuestionPayload>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    check_payload(&state, &payload, None).await?;

    let id = Uuid::new_v4().to_string();
    repositories::questions::create(state.db(), &id, fields(&payload), primitive_now_utc())
        .await
        .map_err(|e| ApiError::from_write(e, "Failed to create question"))?;

    state.cache().invalidate_for(Mutation::Question).await;
    tracing::info!(
        admin_id = %admin.id,
        question_id = %id,
        quiz_id = %payload.quiz_id,
        action = "question_create",
        "Question created"
    );

    let question = load(&state, &id).await?;
    Ok((StatusCode::CREATED, Json(QuestionResponse::from_db(question))))
}

/// Full replacement. Changing `marks` shifts the percentage of every stored attempt.
async fn update_question(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<QuestionPayload>,
) -> Result<Json<QuestionResponse>, ApiError> {
    load(&state, &id).await?;
    check_payload(&state, &payload, Some(&id)).await?;

    repositories::questions::replace(state.db(), &id, fields(&payload), primitive_now_utc())
        .await
        .map_err(|e| ApiError::from_write(e, "Failed to update question"))?;

    state.cache().invalidate_for(Mutation::Question).await;
    tracing::info!(admin_id = %admin.id, question_id = %id, action = "question_update", "Question updated");

    let question = load(&state, &id).await?;
    Ok(Json(QuestionResponse::from_db(question)))
}

async fn delete_question(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let removed = repositories::questions::delete(state.db(), &id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete question"))?;
    if removed == 0 {
        return Err(ApiError::NotFound(QUESTION_MISSING.to_string()));
    }

    state.cache().invalidate_for(Mutation::Question).await;
    tracing::info!(admin_id = %admin.id, question_id = %id, action = "question_delete", "Question deleted");
    Ok(Json(MessageResponse::new("Question deleted successfully")))
}

async fn check_payload(
    state: &AppState,
    payload: &QuestionPayload,
    except_id: Option<&str>,
) -> Result<(), ApiError> {
    validate_payload(payload)?;
    payload.check_correct_option().map_err(ApiError::BadRequest)?;

    let quiz_exists = repositories::quizzes::exists(state.db(), &payload.quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load quiz"))?;
    if !quiz_exists {
        return Err(ApiError::NotFound("Quiz not found".to_string()));
    }

    let taken = repositories::questions::statement_taken(
        state.db(),
        &payload.quiz_id,
        &payload.question_statement,
        except_id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to check question"))?;
    if taken {
        return Err(ApiError::Conflict("Question already exists in this quiz.".to_string()));
    }
    Ok(())
}

fn fields(payload: &QuestionPayload) -> QuestionFields<'_> {
    QuestionFields {
        quiz_id: &payload.quiz_id,
        question_statement: &payload.question_statement,
        option1: &payload.option1,
        option2: &payload.option2,
        option3: payload.option3.as_deref(),
        option4: payload.option4.as_deref(),
        correct_option: payload.correct_option,
        marks: payload.marks,
    }
}

async fn load(state: &AppState, id: &str) -> Result<Question, ApiError> {
    repositories::questions::find_by_id(state.db(), id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load question"))?
        .ok_or_else(|| ApiError::NotFound(QUESTION_MISSING.to_string()))
}

#[cfg(test)]
mod tests;
