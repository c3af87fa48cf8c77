//! Read-through cache in front of Redis.
//!
//! Every backend failure is logged and counted, then treated as a miss or a
//! no-op. Writes invalidate whole namespaces; see [`affected_by`].

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::config::Settings;
use crate::core::redis::RedisHandle;

pub(crate) const DASHBOARD_TTL: Duration = Duration::from_secs(120);
pub(crate) const QUIZ_LIST_TTL: Duration = Duration::from_secs(300);
pub(crate) const SUBJECT_LIST_TTL: Duration = Duration::from_secs(600);
pub(crate) const USER_SCORES_TTL: Duration = Duration::from_secs(180);
pub(crate) const QUIZ_ATTEMPT_TTL: Duration = Duration::from_secs(900);
pub(crate) const USER_PROFILE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Namespace {
    Subjects,
    Chapters,
    Quizzes,
    Questions,
    Attempt,
    Scores,
    Dashboard,
    Users,
}

impl Namespace {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Subjects => "subjects",
            Self::Chapters => "chapters",
            Self::Quizzes => "quizzes",
            Self::Questions => "questions",
            Self::Attempt => "attempt",
            Self::Scores => "scores",
            Self::Dashboard => "dashboard",
            Self::Users => "users",
        }
    }
}

/// The entity a write touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mutation {
    Subject,
    Chapter,
    Quiz,
    Question,
    Score,
    User,
}

/// Namespaces whose cached values may embed data changed by `mutation`.
///
/// Cascading deletes and live percentages mean structural writes also reach
/// score listings and dashboards.
pub(crate) fn affected_by(mutation: Mutation) -> &'static [Namespace] {
    use Namespace::*;

    match mutation {
        Mutation::Subject | Mutation::Chapter => {
            &[Subjects, Chapters, Quizzes, Questions, Attempt, Scores, Dashboard]
        }
        Mutation::Quiz => &[Chapters, Quizzes, Questions, Attempt, Scores, Dashboard],
        Mutation::Question => &[Quizzes, Questions, Attempt, Scores, Dashboard],
        Mutation::Score => &[Scores, Dashboard],
        Mutation::User => &[Users, Scores, Dashboard],
    }
}

#[derive(Clone)]
pub(crate) struct Cache {
    redis: RedisHandle,
    prefix: String,
    enabled: bool,
}

impl Cache {
    pub(crate) fn new(redis: RedisHandle, settings: &Settings) -> Self {
        Self {
            redis,
            prefix: settings.cache().key_prefix.clone(),
            enabled: settings.cache().enabled,
        }
    }

    pub(crate) fn key(&self, namespace: Namespace, suffix: &str) -> String {
        format!("{}:{}:{}", self.prefix, namespace.as_str(), suffix)
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.enabled {
            return None;
        }

        let raw = match self.redis.get(key).await {
            Ok(raw) => raw?,
            Err(err) => {
                record_failure("get", key, &err);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                record_failure("decode", key, &err);
                self.delete(key).await;
                None
            }
        }
    }

    pub(crate) async fn set<T: Serialize>(&self, key: &str, value: &T, timeout: Duration) {
        if !self.enabled {
            return;
        }

        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(err) => {
                record_failure("encode", key, &err);
                return;
            }
        };

        if let Err(err) = self.redis.set_ex(key, &encoded, timeout.as_secs()).await {
            record_failure("set", key, &err);
        }
    }

    pub(crate) async fn delete(&self, key: &str) {
        if let Err(err) = self.redis.del(key).await {
            record_failure("delete", key, &err);
        }
    }

    pub(crate) async fn invalidate(&self, namespace: Namespace) {
        let pattern = format!("{}:{}:*", self.prefix, namespace.as_str());
        match self.redis.delete_matching(&pattern).await {
            Ok(removed) => {
                tracing::debug!(namespace = namespace.as_str(), removed, "Cache namespace cleared")
            }
            Err(err) => record_failure("invalidate", &pattern, &err),
        }
    }

    pub(crate) async fn invalidate_for(&self, mutation: Mutation) {
        for namespace in affected_by(mutation) {
            self.invalidate(*namespace).await;
        }
    }

    /// Drops every key under the application prefix.
    pub(crate) async fn clear(&self) {
        let pattern = format!("{}:*", self.prefix);
        if let Err(err) = self.redis.delete_matching(&pattern).await {
            record_failure("clear", &pattern, &err);
        }
    }
}

fn record_failure(operation: &'static str, key: &str, err: &dyn std::fmt::Display) {
    metrics::counter!("cache_errors_total", "operation" => operation).increment(1);
    tracing::warn!(operation, key, error = %err, "Cache operation failed; continuing without cache");
}
