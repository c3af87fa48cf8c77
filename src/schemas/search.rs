use serde::{Deserialize, Serialize};

use crate::schemas::catalog::{ChapterResponse, SubjectResponse};
use crate::schemas::quiz::{QuestionResponse, QuizResponse};
use crate::schemas::user::UserResponse;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    pub(crate) q: Option<String>,
    #[serde(default, rename = "type")]
    pub(crate) kind: Option<String>,
}

/// Which entity groups a search covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SearchScope {
    All,
    Users,
    Subjects,
    Chapters,
    Quizzes,
    Questions,
}

impl SearchScope {
    pub(crate) fn parse(value: Option<&str>) -> Option<Self> {
        match value.map(str::trim).unwrap_or("all") {
            "" | "all" => Some(Self::All),
            "users" => Some(Self::Users),
            "subjects" => Some(Self::Subjects),
            "chapters" => Some(Self::Chapters),
            "quizzes" => Some(Self::Quizzes),
            "questions" => Some(Self::Questions),
            _ => None,
        }
    }

    pub(crate) fn includes(self, scope: SearchScope) -> bool {
        self == Self::All || self == scope
    }
}

#[derive(Debug, Default, Serialize)]
pub(crate) struct SearchResults {
    pub(crate) users: Vec<UserResponse>,
    pub(crate) subjects: Vec<SubjectResponse>,
    pub(crate) chapters: Vec<ChapterResponse>,
    pub(crate) quizzes: Vec<QuizResponse>,
    pub(crate) questions: Vec<QuestionResponse>,
}

impl SearchResults {
    pub(crate) fn total(&self) -> usize {
        self.users.len()
            + self.subjects.len()
            + self.chapters.len()
            + self.quizzes.len()
            + self.questions.len()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SearchResponse {
    pub(crate) search_query: String,
    pub(crate) total_results: usize,
    pub(crate) results: SearchResults,
}
