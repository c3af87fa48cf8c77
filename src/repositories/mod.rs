pub(crate) mod chapters;
pub(crate) mod dashboard;
pub(crate) mod health;
pub(crate) mod jobs;
pub(crate) mod questions;
pub(crate) mod quizzes;
pub(crate) mod reports;
pub(crate) mod roles;
pub(crate) mod scores;
pub(crate) mod search;
pub(crate) mod subjects;
pub(crate) mod users;
