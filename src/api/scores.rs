//! Attempt submission and score reads.
//!
//! Submissions are the only write regular users make. The attempt cap is
//! enforced inside one transaction holding a row lock on the submitting user,
//! so two concurrent submissions cannot both see four prior attempts.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::validation::{search_term, validate_hh_mm};
use crate::core::cache::{Mutation, Namespace, QUIZ_ATTEMPT_TTL, USER_SCORES_TTL};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::quiz::AttemptResponse;
use crate::schemas::score::{ScoreListQuery, ScoreResponse, ScoreSubmit};
use crate::services::scoring::{self, ScoringError, MAX_ATTEMPTS};

const QUIZ_MISSING: &str = "Quiz not found";
const QUIZ_INACTIVE: &str = "Quiz is not active";

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(list_scores).post(submit_score)).route("/:id", get(get_score))
}

/// Mounted separately at `/quiz-attempt`.
pub(crate) fn attempt_router() -> Router<AppState> {
    Router::new().route("/:quiz_id", get(attempt_quiz))
}

async fn list_scores(
    CurrentUser { user, .. }: CurrentUser,
    State(state): State<AppState>,
    Query(params): Query<ScoreListQuery>,
) -> Result<Json<Vec<ScoreResponse>>, ApiError> {
    let owner = (!user.is_admin()).then_some(user.id.as_str());
    let quiz_id = search_term(params.quiz_id.as_deref());

    let key = state.cache().key(
        Namespace::Scores,
        &format!("list:{}:{}", owner.unwrap_or("all"), quiz_id.unwrap_or_default()),
    );
    if let Some(cached) = state.cache().get::<Vec<ScoreResponse>>(&key).await {
        return Ok(Json(cached));
    }

    let scores = repositories::scores::list(state.db(), owner, quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list scores"))?;
    let response: Vec<ScoreResponse> = scores.into_iter().map(ScoreResponse::from_db).collect();

    state.cache().set(&key, &response, USER_SCORES_TTL).await;
    Ok(Json(response))
}

async fn get_score(
    CurrentUser { user, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ScoreResponse>, ApiError> {
    let score = repositories::scores::find_by_id(state.db(), &id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load score"))?
        .ok_or_else(|| ApiError::NotFound("Score not found".to_string()))?;

    if score.user_id != user.id && !user.is_admin() {
        return Err(ApiError::Forbidden("Access denied"));
    }
    Ok(Json(ScoreResponse::from_db(score)))
}

async fn submit_score(
    CurrentUser { user, .. }: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ScoreSubmit>,
) -> Result<(StatusCode, Json<ScoreResponse>), ApiError> {
    if payload.quiz_id.is_empty() || payload.answers.is_empty() || payload.time_taken.is_empty() {
        return Err(ApiError::BadRequest(
            "Bad request! quiz_id, answers, and time_taken are required.".to_string(),
        ));
    }

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to begin transaction"))?;

    repositories::users::lock_for_update(&mut *tx, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock user"))?
        .ok_or(ApiError::Unauthorized("User not found"))?;

    let quiz = repositories::quizzes::find_by_id(&mut *tx, &payload.quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load quiz"))?
        .ok_or_else(|| ApiError::NotFound(QUIZ_MISSING.to_string()))?;
    if !quiz.is_active {
        return Err(ApiError::BadRequest(QUIZ_INACTIVE.to_string()));
    }

    let attempts = repositories::scores::count_attempts(&mut *tx, &user.id, &quiz.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count attempts"))?;
    if attempts >= MAX_ATTEMPTS {
        return Err(ApiError::Conflict(format!(
            "You have reached the maximum number of attempts ({MAX_ATTEMPTS}) for this quiz"
        )));
    }

    let keys = repositories::questions::answer_keys(&mut *tx, &quiz.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;
    if keys.is_empty() {
        return Err(scoring_error(ScoringError::NoQuestions));
    }
    let answers = scoring::parse_answers(&payload.answers).map_err(scoring_error)?;
    let time_taken = validate_hh_mm(&payload.time_taken)?;
    let outcome = scoring::score_attempt(&keys, &answers).map_err(scoring_error)?;

    let id = Uuid::new_v4().to_string();
    repositories::scores::create(
        &mut *tx,
        repositories::scores::CreateScore {
            id: &id,
            user_id: &user.id,
            quiz_id: &quiz.id,
            time_stamp_of_attempt: primitive_now_utc(),
            total_scored: outcome.total_scored,
            total_questions: outcome.total_questions,
            time_taken: &time_taken,
        },
    )
    .await
    .map_err(|e| ApiError::from_write(e, "Failed to store score"))?;

    let score = repositories::scores::find_by_id(&mut *tx, &id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load score"))?
        .ok_or_else(|| ApiError::Internal("Stored score disappeared".to_string()))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit score"))?;

    metrics::counter!("quiz_attempts_total").increment(1);
    state.cache().invalidate_for(Mutation::Score).await;
    tracing::info!(
        user_id = %user.id,
        quiz_id = %quiz.id,
        score_id = %id,
        total_scored = outcome.total_scored,
        attempt = attempts + 1,
        "Quiz attempt stored"
    );

    Ok((StatusCode::CREATED, Json(ScoreResponse::from_db(score))))
}

fn scoring_error(err: ScoringError) -> ApiError {
    match err {
        ScoringError::NoQuestions => {
            ApiError::BadRequest("No questions found for this quiz".to_string())
        }
        other => ApiError::BadRequest(other.to_string()),
    }
}

/// The quiz as a student sees it: questions without their answers.
async fn attempt_quiz(
    _: CurrentUser,
    State(state): State<AppState>,
    Path(quiz_id): Path<String>,
) -> Result<Json<AttemptResponse>, ApiError> {
    let key = state.cache().key(Namespace::Attempt, &quiz_id);
    if let Some(cached) = state.cache().get::<AttemptResponse>(&key).await {
        return Ok(Json(cached));
    }

    let quiz = repositories::quizzes::find_by_id(state.db(), &quiz_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load quiz"))?
        .ok_or_else(|| ApiError::NotFound(QUIZ_MISSING.to_string()))?;
    if !quiz.is_active {
        return Err(ApiError::BadRequest(QUIZ_INACTIVE.to_string()));
    }

    let questions = repositories::questions::list_for_quiz(state.db(), &quiz.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;
    let response = AttemptResponse::build(quiz, questions);

    state.cache().set(&key, &response, QUIZ_ATTEMPT_TTL).await;
    Ok(Json(response))
}

#[cfg(test)]
mod tests;
