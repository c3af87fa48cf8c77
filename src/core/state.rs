use std::sync::Arc;

use sqlx::PgPool;

use crate::core::{cache::Cache, config::Settings, redis::RedisHandle};
use crate::services::notifier::Notifier;

/// Shared dependencies handed to every handler and job.
#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    redis: RedisHandle,
    cache: Cache,
    notifier: Notifier,
}

impl AppState {
    pub(crate) fn new(settings: Settings, db: PgPool, redis: RedisHandle, notifier: Notifier) -> Self {
        let cache = Cache::new(redis.clone(), &settings);
        Self { inner: Arc::new(InnerState { settings, db, redis, cache, notifier }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn cache(&self) -> &Cache {
        &self.inner.cache
    }

    pub(crate) fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }
}
