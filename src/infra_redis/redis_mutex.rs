use crate::domain_port::*;
use nanoid::nanoid;
use rand::Rng;
use redis::Script;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

const UNLOCK: &str = include_str!("unlock.lua");

#[derive(Debug, Clone)]
pub struct RedisLockConfig {
    /// Lease after which a lock held by a crashed process frees itself.
    pub lease: Duration,
    pub acquire_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RedisLockConfig {
    fn default() -> Self {
        Self {
            lease: Duration::from_secs(8),
            acquire_timeout: Duration::from_secs(4),
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(500),
        }
    }
}

/// [`MutexProvider`] on a single Redis node: `SET NX PX` to acquire,
/// holder-checked delete to release.
pub struct RedisMutexProvider {
    conn: ConnectionManager,
    prefix: String,
    config: RedisLockConfig,
    unlock_script: Script,
}

impl RedisMutexProvider {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>, config: RedisLockConfig) -> Self {
        RedisMutexProvider {
            conn,
            prefix: prefix.into(),
            config,
            unlock_script: Script::new(UNLOCK),
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}:{}", self.prefix, name)
    }

    async fn try_lock(&self, key: &str, holder: &str) -> Result<bool, LockError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(holder)
            .arg("NX")
            .arg("PX")
            .arg(self.config.lease.as_millis() as u64)
            .query_async(&mut conn)
            .await
            .map_err(|e| LockError::Unavailable(e.to_string()))?;
        Ok(reply.is_some())
    }
}

#[async_trait::async_trait]
impl MutexProvider for RedisMutexProvider {
    async fn lock(&self, name: &str) -> Result<LockToken, LockError> {
        let key = self.key(name);
        let holder = nanoid!();
        let deadline = Instant::now() + self.config.acquire_timeout;
        let mut backoff = self.config.initial_backoff;

        loop {
            if self.try_lock(&key, &holder).await? {
                debug!(name, %holder, "lock acquired");
                return Ok(LockToken {
                    name: name.to_string(),
                    holder,
                });
            }

            if Instant::now() >= deadline {
                return Err(LockError::Timeout {
                    name: name.to_string(),
                });
            }

            let jitter_ms = rand::rng().random_range(0..=backoff.as_millis() as u64 / 2);
            let sleep = backoff + Duration::from_millis(jitter_ms);
            debug!(name, backoff_ms = sleep.as_millis() as u64, "lock held, backing off");
            tokio::time::sleep(sleep).await;

            backoff = (backoff * 2).min(self.config.max_backoff);
        }
    }

    async fn unlock(&self, token: &LockToken) -> Result<bool, LockError> {
        let key = self.key(&token.name);
        let mut conn = self.conn.clone();
        let released: i64 = self
            .unlock_script
            .key(&key)
            .arg(&token.holder)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| LockError::Unavailable(e.to_string()))?;
        Ok(released == 1)
    }
}
