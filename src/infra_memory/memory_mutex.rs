use crate::domain_port::*;
use dashmap::DashMap;
use nanoid::nanoid;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Process-local [`MutexProvider`]. Exclusion only holds within one process,
/// which is enough for a single node and for tests.
pub struct MemoryMutexProvider {
    locks: DashMap<String, Arc<Mutex<()>>>,
    held: DashMap<String, (String, OwnedMutexGuard<()>)>,
    wait_limit: Option<Duration>,
    available: AtomicBool,
}

impl MemoryMutexProvider {
    /// Waiters block until the lock is free.
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
            held: DashMap::new(),
            wait_limit: None,
            available: AtomicBool::new(true),
        }
    }

    /// Waiters give up with [`LockError::Timeout`] after `limit`.
    pub fn with_wait_limit(limit: Duration) -> Self {
        Self {
            wait_limit: Some(limit),
            ..Self::new()
        }
    }

    /// An unavailable provider never answers `lock`, like an unreachable
    /// coordination service.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_held(&self, name: &str) -> bool {
        self.locks
            .get(name)
            .map(|m| m.try_lock().is_err())
            .unwrap_or(false)
    }

    fn mutex_for(&self, name: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

impl Default for MemoryMutexProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MutexProvider for MemoryMutexProvider {
    async fn lock(&self, name: &str) -> Result<LockToken, LockError> {
        if !self.available.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        let mutex = self.mutex_for(name);
        let guard = match self.wait_limit {
            Some(limit) => tokio::time::timeout(limit, mutex.lock_owned())
                .await
                .map_err(|_| LockError::Timeout {
                    name: name.to_string(),
                })?,
            None => mutex.lock_owned().await,
        };

        let holder = nanoid!();
        self.held.insert(holder.clone(), (name.to_string(), guard));
        debug!(name, %holder, "lock acquired");
        Ok(LockToken {
            name: name.to_string(),
            holder,
        })
    }

    async fn unlock(&self, token: &LockToken) -> Result<bool, LockError> {
        let released = self
            .held
            .remove_if(&token.holder, |_, (name, _)| *name == token.name)
            .is_some();
        debug!(name = %token.name, holder = %token.holder, released, "lock released");
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lock_is_exclusive_until_unlocked() {
        let provider = MemoryMutexProvider::with_wait_limit(Duration::from_millis(20));
        let token = provider.lock("seq").await.unwrap();
        assert!(provider.is_held("seq"));

        assert!(matches!(
            provider.lock("seq").await,
            Err(LockError::Timeout { .. })
        ));

        assert!(provider.unlock(&token).await.unwrap());
        assert!(!provider.is_held("seq"));
        let again = provider.lock("seq").await.unwrap();
        assert!(provider.unlock(&again).await.unwrap());
    }

    #[tokio::test]
    async fn second_unlock_reports_not_held() {
        let provider = MemoryMutexProvider::new();
        let token = provider.lock("seq").await.unwrap();
        assert!(provider.unlock(&token).await.unwrap());
        assert!(!provider.unlock(&token).await.unwrap());
    }

    #[tokio::test]
    async fn names_are_independent() {
        let provider = MemoryMutexProvider::with_wait_limit(Duration::from_millis(20));
        let a = provider.lock("a").await.unwrap();
        let b = provider.lock("b").await.unwrap();
        assert!(provider.unlock(&a).await.unwrap());
        assert!(provider.unlock(&b).await.unwrap());
    }
}
