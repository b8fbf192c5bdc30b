//! Shared helpers for the integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::sync::Arc;
use tokenseq::application_impl::*;
use tokenseq::domain_model::*;
use tokenseq::domain_port::*;
use tokenseq::infra_memory::*;

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Token details with the given ids and expiries relative to `now`.
pub fn token_details(
    access_id: &str,
    refresh_id: &str,
    now: DateTime<Utc>,
    access_secs: i64,
    refresh_secs: i64,
) -> TokenDetails {
    TokenDetails {
        access_token: format!("at-{access_id}"),
        refresh_token: format!("rt-{refresh_id}"),
        access_id: access_id.to_string(),
        refresh_id: refresh_id.to_string(),
        access_expires_at: now + Duration::seconds(access_secs),
        refresh_expires_at: now + Duration::seconds(refresh_secs),
    }
}

pub fn access_details(details: &TokenDetails, subject: &str) -> AccessDetails {
    AccessDetails {
        access_id: details.access_id.clone(),
        refresh_id: details.refresh_id.clone(),
        subject_id: SubjectId::from(subject),
    }
}

pub struct Stack {
    pub store: Arc<MemoryExpiringStore>,
    pub mutex: Arc<MemoryMutexProvider>,
    pub allocator: Arc<SequenceAllocator>,
    pub tokens: Arc<StoreTokenLifecycle>,
    pub accounts: RealAccountService,
}

/// Memory-backed service stack with short token lifetimes.
pub fn stack() -> Stack {
    let store = Arc::new(MemoryExpiringStore::new());
    let mutex = Arc::new(MemoryMutexProvider::new());
    let allocator = Arc::new(SequenceAllocator::new(
        mutex.clone(),
        store.clone(),
        SequenceConfig::default(),
    ));
    let tokens = Arc::new(StoreTokenLifecycle::new(store.clone()));
    let accounts = RealAccountService::new(
        allocator.clone(),
        tokens.clone(),
        Arc::new(FakeTokenCodec::new()),
        AccountConfig::new(
            std::time::Duration::from_secs(60),
            std::time::Duration::from_secs(600),
        )
        .unwrap(),
    );
    Stack {
        store,
        mutex,
        allocator,
        tokens,
        accounts,
    }
}

/// Counter store whose increment is a separate read and write, so only the
/// allocator's lock keeps concurrent increments apart.
pub struct RacyCounterStore {
    inner: MemoryExpiringStore,
}

impl RacyCounterStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryExpiringStore::new(),
        }
    }
}

#[async_trait::async_trait]
impl ExpiringStore for RacyCounterStore {
    async fn set(&self, key: &str, value: &str, ttl: std::time::Duration) -> Result<bool, StoreError> {
        self.inner.set(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn del(&self, keys: &[&str]) -> Result<u64, StoreError> {
        self.inner.del(keys).await
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let current: i64 = match self.inner.get(key).await? {
            Some(v) => v
                .parse()
                .map_err(|_| StoreError::Protocol("not an integer".to_string()))?,
            None => 0,
        };
        tokio::task::yield_now().await;
        let next = current + 1;
        self.inner
            .set(key, &next.to_string(), std::time::Duration::from_secs(3600))
            .await?;
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: std::time::Duration) -> Result<bool, StoreError> {
        self.inner.expire(key, ttl).await
    }
}
