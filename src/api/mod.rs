pub(crate) mod auth;
pub(crate) mod chapters;
pub(crate) mod dashboard;
pub(crate) mod errors;
pub(crate) mod exports;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod jobs;
pub(crate) mod questions;
pub(crate) mod quizzes;
pub(crate) mod router;
pub(crate) mod scores;
pub(crate) mod search;
pub(crate) mod subjects;
pub(crate) mod users;
pub(crate) mod validation;
