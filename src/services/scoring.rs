//! Attempt scoring.
//!
//! A submission maps question ids to the chosen option (1-4). Each question
//! of the quiz whose chosen option equals its correct option contributes its
//! marks. Percentages are always taken against the quiz's current marks sum,
//! so they are computed at read time and never stored.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

/// Attempts allowed per user per quiz.
pub(crate) const MAX_ATTEMPTS: i64 = 5;

const VALID_OPTIONS: std::ops::RangeInclusive<i64> = 1..=4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AnswerKey {
    pub(crate) question_id: String,
    pub(crate) correct_option: i32,
    pub(crate) marks: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScoreOutcome {
    pub(crate) total_scored: i32,
    pub(crate) total_questions: i32,
    pub(crate) total_marks: i64,
}

impl ScoreOutcome {
    pub(crate) fn percentage(&self) -> f64 {
        percentage(self.total_scored as i64, self.total_marks)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ScoringError {
    #[error("Invalid option for question {question_id}. Options must be between 1 and 4.")]
    InvalidOption { question_id: String },
    #[error("Quiz has no questions")]
    NoQuestions,
    #[error("Total score is too large")]
    ScoreOverflow,
}

/// Validates raw JSON answer values. Every value must be an integer in 1..=4.
pub(crate) fn parse_answers(raw: &HashMap<String, Value>) -> Result<HashMap<String, i32>, ScoringError> {
    raw.iter()
        .map(|(question_id, value)| match value.as_i64() {
            Some(option) if VALID_OPTIONS.contains(&option) => {
                Ok((question_id.clone(), option as i32))
            }
            _ => Err(ScoringError::InvalidOption { question_id: question_id.clone() }),
        })
        .collect()
}

pub(crate) fn score_attempt(
    keys: &[AnswerKey],
    answers: &HashMap<String, i32>,
) -> Result<ScoreOutcome, ScoringError> {
    if keys.is_empty() {
        return Err(ScoringError::NoQuestions);
    }

    let scored: i64 = keys
        .iter()
        .filter(|key| answers.get(&key.question_id) == Some(&key.correct_option))
        .map(|key| i64::from(key.marks))
        .sum();
    let total_scored = i32::try_from(scored).map_err(|_| ScoringError::ScoreOverflow)?;
    let total_questions = i32::try_from(keys.len()).map_err(|_| ScoringError::ScoreOverflow)?;
    let total_marks = keys.iter().map(|key| i64::from(key.marks)).sum();

    Ok(ScoreOutcome { total_scored, total_questions, total_marks })
}

/// `scored / possible * 100`, rounded to two decimals; zero when nothing is possible.
pub(crate) fn percentage(scored: i64, possible: i64) -> f64 {
    if possible <= 0 {
        return 0.0;
    }
    round2(scored as f64 / possible as f64 * 100.0)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
