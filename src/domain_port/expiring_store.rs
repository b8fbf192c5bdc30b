use std::time::Duration;

/// Shared key-value store with per-key expiry. Every operation is atomic at
/// the single-key level; nothing spans keys.
#[async_trait::async_trait]
pub trait ExpiringStore: Send + Sync {
    /// Write `value` under `key` for `ttl`. `Ok(false)` is the store saying
    /// the write was not applied.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Returns how many of `keys` were removed.
    async fn del(&self, keys: &[&str]) -> Result<u64, StoreError>;

    /// A missing key counts from 0, so the first call yields 1.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// Set a time-to-live on an existing key. `Ok(false)` if the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected store reply: {0}")]
    Protocol(String),
}
