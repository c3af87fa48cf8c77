use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::{format_date, format_primitive};
use crate::db::models::{Question, Quiz};
use crate::schemas::{trimmed, trimmed_opt};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuizPayload {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(
        min = 3,
        max = 200,
        message = "Length of title should be between 3 and 200 characters"
    ))]
    pub(crate) title: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "chapter_id is required"))]
    pub(crate) chapter_id: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "date_of_quiz is required"))]
    pub(crate) date_of_quiz: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "time_duration is required"))]
    pub(crate) time_duration: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(max = 1000, message = "Remarks too long (max 1000 characters)"))]
    pub(crate) remarks: String,
    #[serde(default)]
    pub(crate) is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionPayload {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "quiz_id is required"))]
    pub(crate) quiz_id: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(
        min = 3,
        max = 1000,
        message = "Length of question should be between 3 and 1000 characters"
    ))]
    pub(crate) question_statement: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 500, message = "option1 is required"))]
    pub(crate) option1: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 500, message = "option2 is required"))]
    pub(crate) option2: String,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(max = 500, message = "option3 is too long"))]
    pub(crate) option3: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[validate(length(max = 500, message = "option4 is too long"))]
    pub(crate) option4: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 4, message = "Correct option must be 1, 2, 3, or 4"))]
    pub(crate) correct_option: i32,
    #[serde(default = "default_marks")]
    #[validate(range(min = 1, max = 1000, message = "marks must be between 1 and 1000"))]
    pub(crate) marks: i32,
}

const fn default_marks() -> i32 {
    1
}

impl QuestionPayload {
    /// Number of filled-in options, 2 to 4.
    pub(crate) fn available_options(&self) -> usize {
        2 + [&self.option3, &self.option4].iter().filter(|option| option.is_some()).count()
    }

    /// A correct option must point at a populated choice.
    pub(crate) fn check_correct_option(&self) -> Result<(), String> {
        let populated = match self.correct_option {
            1 | 2 => true,
            3 => self.option3.is_some(),
            4 => self.option4.is_some(),
            _ => false,
        };
        if populated {
            Ok(())
        } else {
            Err(format!(
                "Correct option {} is not available. Only {} options provided.",
                self.correct_option,
                self.available_options()
            ))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct QuizListQuery {
    #[serde(default)]
    pub(crate) search: Option<String>,
    #[serde(default)]
    pub(crate) chapter_id: Option<String>,
    #[serde(default)]
    pub(crate) is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct QuestionListQuery {
    #[serde(default)]
    pub(crate) search: Option<String>,
    #[serde(default)]
    pub(crate) quiz_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct QuizResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) chapter_id: String,
    pub(crate) chapter_name: String,
    pub(crate) subject_id: String,
    pub(crate) subject_name: String,
    pub(crate) date_of_quiz: String,
    pub(crate) time_duration: String,
    pub(crate) remarks: String,
    pub(crate) is_active: bool,
    pub(crate) question_count: i64,
    pub(crate) total_marks: i64,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl QuizResponse {
    pub(crate) fn from_db(quiz: Quiz) -> Self {
        Self {
            id: quiz.id,
            title: quiz.title,
            chapter_id: quiz.chapter_id,
            chapter_name: quiz.chapter_name,
            subject_id: quiz.subject_id,
            subject_name: quiz.subject_name,
            date_of_quiz: format_date(quiz.date_of_quiz),
            time_duration: quiz.time_duration,
            remarks: quiz.remarks,
            is_active: quiz.is_active,
            question_count: quiz.question_count,
            total_marks: quiz.total_marks,
            created_at: format_primitive(quiz.created_at),
            updated_at: format_primitive(quiz.updated_at),
        }
    }
}

/// Admin view of a question, answer included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) quiz_title: String,
    pub(crate) question_statement: String,
    pub(crate) option1: String,
    pub(crate) option2: String,
    pub(crate) option3: Option<String>,
    pub(crate) option4: Option<String>,
    pub(crate) correct_option: i32,
    pub(crate) marks: i32,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl QuestionResponse {
    pub(crate) fn from_db(question: Question) -> Self {
        Self {
            id: question.id,
            quiz_id: question.quiz_id,
            quiz_title: question.quiz_title,
            question_statement: question.question_statement,
            option1: question.option1,
            option2: question.option2,
            option3: question.option3,
            option4: question.option4,
            correct_option: question.correct_option,
            marks: question.marks,
            created_at: format_primitive(question.created_at),
            updated_at: format_primitive(question.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AttemptQuiz {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) time_duration: String,
    pub(crate) remarks: String,
    pub(crate) question_count: usize,
    pub(crate) total_marks: i64,
}

/// A question as shown to someone taking the quiz; never carries the answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AttemptQuestion {
    pub(crate) id: String,
    pub(crate) question_statement: String,
    pub(crate) option1: String,
    pub(crate) option2: String,
    pub(crate) option3: Option<String>,
    pub(crate) option4: Option<String>,
    pub(crate) marks: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct AttemptResponse {
    pub(crate) quiz: AttemptQuiz,
    pub(crate) questions: Vec<AttemptQuestion>,
}

impl AttemptResponse {
    pub(crate) fn build(quiz: Quiz, questions: Vec<Question>) -> Self {
        let questions: Vec<AttemptQuestion> = questions
            .into_iter()
            .map(|question| AttemptQuestion {
                id: question.id,
                question_statement: question.question_statement,
                option1: question.option1,
                option2: question.option2,
                option3: question.option3,
                option4: question.option4,
                marks: question.marks,
            })
            .collect();

        Self {
            quiz: AttemptQuiz {
                id: quiz.id,
                title: quiz.title,
                time_duration: quiz.time_duration,
                remarks: quiz.remarks,
                question_count: questions.len(),
                total_marks: quiz.total_marks,
            },
            questions,
        }
    }
}
