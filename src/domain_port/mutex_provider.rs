/// Proof of holding a named lock. Only the holder that acquired it can
/// release it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken {
    pub name: String,
    pub holder: String,
}

/// Cluster-wide exclusive locks identified by name. No fairness among
/// waiters is promised.
#[async_trait::async_trait]
pub trait MutexProvider: Send + Sync {
    /// Wait for the named lock according to the provider's wait policy.
    async fn lock(&self, name: &str) -> Result<LockToken, LockError>;

    /// `Ok(false)` means the lock was no longer held by `token`.
    async fn unlock(&self, token: &LockToken) -> Result<bool, LockError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("lock provider unavailable: {0}")]
    Unavailable(String),
    #[error("timed out waiting for lock {name}")]
    Timeout { name: String },
}
