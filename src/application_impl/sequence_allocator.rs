use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct SequenceConfig {
    /// One lock serializes every allocation regardless of day.
    pub lock_name: String,
    /// Counter key is this prefix followed by `YYYYMMDD`.
    pub counter_prefix: String,
    /// Retention for counters of days that have already ended.
    pub min_counter_ttl: Duration,
    /// Upper bound on the unlock round trip, which runs outside the caller's
    /// deadline.
    pub release_timeout: Duration,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            lock_name: "user-id-sequence".to_string(),
            counter_prefix: "user".to_string(),
            min_counter_ttl: Duration::from_secs(24 * 60 * 60),
            release_timeout: Duration::from_secs(1),
        }
    }
}

/// Lock held by an in-flight allocation. If the allocation future is dropped
/// before `disarm`, the lock is released from a detached task.
struct HeldLock {
    mutex: Arc<dyn MutexProvider>,
    token: LockToken,
    release_timeout: Duration,
    armed: bool,
}

impl HeldLock {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for HeldLock {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(lock = %self.token.name, "allocation dropped outside a runtime, lock not released");
            return;
        };
        let mutex = self.mutex.clone();
        let token = self.token.clone();
        let release_timeout = self.release_timeout;
        runtime.spawn(async move {
            match tokio::time::timeout(release_timeout, mutex.unlock(&token)).await {
                Ok(Ok(released)) => {
                    debug!(lock = %token.name, released, "released lock of dropped allocation")
                }
                Ok(Err(e)) => warn!(lock = %token.name, "release after dropped allocation failed: {}", e),
                Err(_) => warn!(lock = %token.name, "release after dropped allocation timed out"),
            }
        });
    }
}

/// Daily counter guarded by a distributed mutex. Every allocation takes the
/// lock, increments, sets the counter's expiry and releases.
pub struct SequenceAllocator {
    mutex: Arc<dyn MutexProvider>,
    store: Arc<dyn ExpiringStore>,
    config: SequenceConfig,
}

impl SequenceAllocator {
    pub fn new(
        mutex: Arc<dyn MutexProvider>,
        store: Arc<dyn ExpiringStore>,
        config: SequenceConfig,
    ) -> Self {
        Self {
            mutex,
            store,
            config,
        }
    }

    pub fn counter_key(&self, day: NaiveDate) -> String {
        format!("{}{}", self.config.counter_prefix, day_stamp(day))
    }

    /// Time left until the local midnight that ends `day`.
    fn counter_ttl(&self, day: NaiveDate) -> Duration {
        day.succ_opt()
            .and_then(|next| next.and_hms_opt(0, 0, 0))
            .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
            .and_then(|midnight| (midnight - Local::now()).to_std().ok())
            .filter(|ttl| !ttl.is_zero())
            .unwrap_or(self.config.min_counter_ttl)
    }

    async fn advance(&self, ctx: &OpContext, day: NaiveDate) -> Result<u64, AllocError> {
        let key = self.counter_key(day);
        let value = ctx
            .run(self.store.incr(&key))
            .await?
            .map_err(|e| AllocError::StoreUnavailable(e.to_string()))?;
        ctx.run(self.store.expire(&key, self.counter_ttl(day)))
            .await?
            .map_err(|e| AllocError::StoreUnavailable(e.to_string()))?;
        u64::try_from(value)
            .map_err(|_| AllocError::StoreUnavailable(format!("counter {} is negative", key)))
    }

    async fn release(&self, token: &LockToken) -> Result<(), String> {
        match tokio::time::timeout(self.config.release_timeout, self.mutex.unlock(token)).await {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => Err("lock was no longer held".to_string()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err("unlock timed out".to_string()),
        }
    }
}

#[async_trait::async_trait]
impl IdAllocator for SequenceAllocator {
    async fn allocate(&self, ctx: &OpContext, day: NaiveDate) -> Result<SequentialId, AllocError> {
        let token = match ctx.run(self.mutex.lock(&self.config.lock_name)).await {
            Ok(Ok(token)) => token,
            Ok(Err(e)) => return Err(AllocError::LockUnavailable(e.to_string())),
            Err(interrupted) => {
                debug!(lock = %self.config.lock_name, %interrupted, "gave up waiting for lock");
                return Err(interrupted.into());
            }
        };

        let mut held = HeldLock {
            mutex: self.mutex.clone(),
            token,
            release_timeout: self.config.release_timeout,
            armed: true,
        };
        let advanced = self.advance(ctx, day).await;
        let released = self.release(&held.token).await;
        held.disarm();
        let token = &held.token;

        let seq = match (advanced, released) {
            (Ok(seq), Ok(())) => seq,
            (Ok(seq), Err(reason)) => {
                let unconfirmed = SequentialId::new(day, seq).to_string();
                warn!(lock = %token.name, %unconfirmed, %reason, "lock release failed");
                return Err(AllocError::LockReleaseFailed {
                    unconfirmed,
                    reason,
                });
            }
            (Err(e), released) => {
                if let Err(reason) = released {
                    warn!(lock = %token.name, %reason, "lock release failed after aborted allocation");
                }
                return Err(e);
            }
        };

        let id = SequentialId::new(day, seq);
        debug!(%id, "allocated");
        Ok(id)
    }
}
