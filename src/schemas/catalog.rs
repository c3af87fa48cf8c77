use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Chapter, Subject};
use crate::schemas::trimmed;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubjectPayload {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(
        min = 3,
        max = 100,
        message = "Length of name should be between 3 and 100 characters"
    ))]
    pub(crate) name: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 1000, message = "Description must be 1-1000 characters"))]
    pub(crate) description: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ChapterPayload {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(
        min = 3,
        max = 100,
        message = "Length of name should be between 3 and 100 characters"
    ))]
    pub(crate) name: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 1000, message = "Description must be 1-1000 characters"))]
    pub(crate) description: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "subject_id is required"))]
    pub(crate) subject_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SubjectListQuery {
    #[serde(default)]
    pub(crate) search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChapterListQuery {
    #[serde(default)]
    pub(crate) search: Option<String>,
    #[serde(default)]
    pub(crate) subject_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SubjectResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) chapters_count: i64,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl SubjectResponse {
    pub(crate) fn from_db(subject: Subject) -> Self {
        Self {
            id: subject.id,
            name: subject.name,
            description: subject.description,
            chapters_count: subject.chapters_count,
            created_at: format_primitive(subject.created_at),
            updated_at: format_primitive(subject.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ChapterResponse {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) subject_id: String,
    pub(crate) subject_name: String,
    pub(crate) quizzes_count: i64,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl ChapterResponse {
    pub(crate) fn from_db(chapter: Chapter) -> Self {
        Self {
            id: chapter.id,
            name: chapter.name,
            description: chapter.description,
            subject_id: chapter.subject_id,
            subject_name: chapter.subject_name,
            quizzes_count: chapter.quizzes_count,
            created_at: format_primitive(chapter.created_at),
            updated_at: format_primitive(chapter.updated_at),
        }
    }
}
