pub(crate) mod jobs;
pub(crate) mod schedule;
pub(crate) mod scheduler;
