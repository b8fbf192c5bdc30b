use crate::domain_port::*;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError};
use std::time::Duration;

pub struct RedisExpiringStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisExpiringStore {
    /// An empty `prefix` leaves keys untouched.
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisExpiringStore {
            conn,
            prefix: prefix.into(),
        }
    }

    fn key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.prefix, key)
        }
    }
}

/// Redis rejects non-positive expiries, so the shortest one stands in for
/// "already expired".
fn ttl_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

fn store_error(e: RedisError) -> StoreError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_timeout() {
        StoreError::Unavailable(e.to_string())
    } else {
        StoreError::Protocol(e.to_string())
    }
}

#[async_trait::async_trait]
impl ExpiringStore for RedisExpiringStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(matches!(reply.as_deref(), Some("OK")))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let val: Option<String> = conn.get(&key).await.map_err(store_error)?;
        Ok(val)
    }

    async fn del(&self, keys: &[&str]) -> Result<u64, StoreError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let keys: Vec<String> = keys.iter().map(|k| self.key(k)).collect();
        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(&keys).await.map_err(store_error)?;
        Ok(removed)
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let value: i64 = conn.incr(&key, 1).await.map_err(store_error)?;
        Ok(value)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let applied: bool = conn
            .pexpire(&key, ttl_millis(ttl) as i64)
            .await
            .map_err(store_error)?;
        Ok(applied)
    }
}
