use std::sync::Arc;

use redis::aio::ConnectionManager;
use redis::{cmd, Client, ErrorKind, RedisError};
use tokio::sync::RwLock;

const SCAN_BATCH: usize = 200;

#[derive(Clone)]
pub(crate) struct RedisHandle {
    url: String,
    manager: Arc<RwLock<Option<ConnectionManager>>>,
}

#[derive(Debug, Clone)]
pub(crate) enum RedisHealth {
    Healthy,
    Disconnected,
    Unhealthy(String),
}

impl RedisHandle {
    pub(crate) fn new(url: String) -> Self {
        Self { url, manager: Arc::new(RwLock::new(None)) }
    }

    pub(crate) async fn connect(&self) -> Result<(), RedisError> {
        let client = Client::open(self.url.clone())?;
        let manager = ConnectionManager::new(client).await?;
        let mut guard = self.manager.write().await;
        *guard = Some(manager);
        Ok(())
    }

    pub(crate) async fn disconnect(&self) {
        let mut guard = self.manager.write().await;
        *guard = None;
    }

    pub(crate) async fn is_connected(&self) -> bool {
        self.manager.read().await.is_some()
    }

    pub(crate) async fn health(&self) -> RedisHealth {
        let Ok(mut manager) = self.connection().await else {
            return RedisHealth::Disconnected;
        };

        match cmd("PING").query_async::<_, String>(&mut manager).await {
            Ok(_) => RedisHealth::Healthy,
            Err(err) => RedisHealth::Unhealthy(err.to_string()),
        }
    }

    pub(crate) async fn get(&self, key: &str) -> Result<Option<String>, RedisError> {
        let mut manager = self.connection().await?;
        cmd("GET").arg(key).query_async::<_, Option<String>>(&mut manager).await
    }

    pub(crate) async fn set_ex(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> Result<(), RedisError> {
        let mut manager = self.connection().await?;
        cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_seconds.max(1))
            .query_async::<_, ()>(&mut manager)
            .await
    }

    pub(crate) async fn exists(&self, key: &str) -> Result<bool, RedisError> {
        let mut manager = self.connection().await?;
        cmd("EXISTS").arg(key).query_async::<_, bool>(&mut manager).await
    }

    pub(crate) async fn del(&self, key: &str) -> Result<u64, RedisError> {
        let mut manager = self.connection().await?;
        cmd("DEL").arg(key).query_async::<_, u64>(&mut manager).await
    }

    /// Deletes every key matching `pattern` with cursor-based SCAN, never KEYS.
    pub(crate) async fn delete_matching(&self, pattern: &str) -> Result<u64, RedisError> {
        let mut manager = self.connection().await?;
        let mut cursor: u64 = 0;
        let mut removed = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut manager)
                .await?;

            if !keys.is_empty() {
                removed += cmd("DEL").arg(&keys).query_async::<_, u64>(&mut manager).await?;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(removed)
    }

    /// Fixed-window counter. Always allows when Redis is not connected.
    pub(crate) async fn rate_limit(
        &self,
        key: &str,
        limit: u64,
        window_seconds: u64,
    ) -> Result<bool, RedisError> {
        let Ok(mut manager) = self.connection().await else {
            return Ok(true);
        };

        let script = redis::Script::new(
            r#"
            local current = redis.call("INCR", KEYS[1])
            if current == 1 then
                redis.call("EXPIRE", KEYS[1], ARGV[1])
            end
            return current
        "#,
        );

        let current: i64 =
            script.key(key).arg(window_seconds as i64).invoke_async(&mut manager).await?;

        Ok(current <= limit as i64)
    }

    async fn connection(&self) -> Result<ConnectionManager, RedisError> {
        let manager = { self.manager.read().await.clone() };
        manager.ok_or_else(|| RedisError::from((ErrorKind::IoError, "redis is not connected")))
    }
}

#[cfg(test)]
mod tests {
    use super::RedisHandle;
    use crate::test_support;
    use uuid::Uuid;

    #[tokio::test]
    async fn disconnected_handle_reports_errors_but_allows_rate_limit() {
        let redis = RedisHandle::new("redis://127.0.0.1:1/0".to_string());

        assert!(!redis.is_connected().await);
        assert!(redis.get("missing").await.is_err());
        assert!(redis.rate_limit("rl:any", 1, 5).await.expect("rate limit"));
    }

    #[tokio::test]
    async fn rate_limit_enforces_limit() {
        let Some(redis) = test_support::connect_test_redis().await else {
            return;
        };

        let key = format!("rate-limit:{}", Uuid::new_v4());
        let first = redis.rate_limit(&key, 1, 5).await.expect("rate limit");
        let second = redis.rate_limit(&key, 1, 5).await.expect("rate limit");

        assert!(first);
        assert!(!second);
    }

    #[tokio::test]
    async fn delete_matching_only_touches_the_pattern() {
        let Some(redis) = test_support::connect_test_redis().await else {
            return;
        };

        let ns = Uuid::new_v4();
        redis.set_ex(&format!("t:{ns}:a"), "1", 60).await.expect("set a");
        redis.set_ex(&format!("t:{ns}:b"), "2", 60).await.expect("set b");
        redis.set_ex(&format!("other:{ns}"), "3", 60).await.expect("set other");

        let removed = redis.delete_matching(&format!("t:{ns}:*")).await.expect("scan delete");
        assert_eq!(removed, 2);
        assert!(redis.get(&format!("t:{ns}:a")).await.expect("get").is_none());
        assert_eq!(redis.get(&format!("other:{ns}")).await.expect("get").as_deref(), Some("3"));
    }
}
