use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::api::validation::search_term;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::catalog::{ChapterResponse, SubjectResponse};
use crate::schemas::quiz::{QuestionResponse, QuizResponse};
use crate::schemas::search::{SearchQuery, SearchResponse, SearchResults, SearchScope};
use crate::schemas::user::UserResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(search))
}

async fn search(
    CurrentAdmin(_): CurrentAdmin,
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = search_term(params.q.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Search query is required".to_string()))?;
    let scope = SearchScope::parse(params.kind.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Invalid search type".to_string()))?;

    let db = state.db();
    let failed = |e: sqlx::Error| ApiError::internal(e, "Search failed");
    let mut results = SearchResults::default();

    if scope.includes(SearchScope::Users) {
        results.users = repositories::search::users(db, query)
            .await
            .map_err(failed)?
            .into_iter()
            .map(UserResponse::from_db)
            .collect();
    }
    if scope.includes(SearchScope::Subjects) {
        results.subjects = repositories::search::subjects(db, query)
            .await
            .map_err(failed)?
            .into_iter()
            .map(SubjectResponse::from_db)
            .collect();
    }
    if scope.includes(SearchScope::Chapters) {
        results.chapters = repositories::search::chapters(db, query)
            .await
            .map_err(failed)?
            .into_iter()
            .map(ChapterResponse::from_db)
            .collect();
    }
    if scope.includes(SearchScope::Quizzes) {
        results.quizzes = repositories::search::quizzes(db, query)
            .await
            .map_err(failed)?
            .into_iter()
            .map(QuizResponse::from_db)
            .collect();
    }
    if scope.includes(SearchScope::Questions) {
        results.questions = repositories::search::questions(db, query)
            .await
            .map_err(failed)?
            .into_iter()
            .map(QuestionResponse::from_db)
            .collect();
    }

    Ok(Json(SearchResponse {
        search_query: query.to_string(),
        total_results: results.total(),
        results,
    }))
}
