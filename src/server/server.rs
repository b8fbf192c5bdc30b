use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::{OpContext, SequentialId};
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use chrono::NaiveDate;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Process-wide handles, built once at start and shared by every request.
pub struct Server {
    pub allocator: Arc<dyn IdAllocator>,
    pub account_service: Arc<dyn AccountService>,
    /// Parent of every request context; cancelled on shutdown.
    root: OpContext,
    request_timeout: Duration,
    process_local: bool,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let (store, mutex): (Arc<dyn ExpiringStore>, Arc<dyn MutexProvider>) =
            match settings.store.backend.as_str() {
                "memory" => {
                    warn!("memory store selected, state lives only as long as this process");
                    let store: Arc<dyn ExpiringStore> = Arc::new(MemoryExpiringStore::new());
                    let mutex: Arc<dyn MutexProvider> = Arc::new(
                        MemoryMutexProvider::with_wait_limit(Duration::from_millis(
                            settings.lock.acquire_timeout_ms,
                        )),
                    );
                    (store, mutex)
                }
                "redis" => {
                    let redis_client = redis::Client::open(settings.store.redis_dsn.as_str())?;
                    let mut redis_manager = redis_client.get_connection_manager().await?;
                    let _: String = redis::cmd("PING").query_async(&mut redis_manager).await?;
                    info!("connected to redis");

                    let lock_config = RedisLockConfig {
                        lease: Duration::from_millis(settings.lock.lease_ms),
                        acquire_timeout: Duration::from_millis(settings.lock.acquire_timeout_ms),
                        initial_backoff: Duration::from_millis(settings.lock.initial_backoff_ms),
                        max_backoff: Duration::from_millis(settings.lock.max_backoff_ms),
                    };
                    let store: Arc<dyn ExpiringStore> = Arc::new(RedisExpiringStore::new(
                        redis_manager.clone(),
                        settings.store.key_prefix.clone(),
                    ));
                    let mutex: Arc<dyn MutexProvider> = Arc::new(RedisMutexProvider::new(
                        redis_manager,
                        "lock",
                        lock_config,
                    ));
                    (store, mutex)
                }
                other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
            };

        let token_codec: Arc<dyn TokenCodec> = match settings.auth.codec.as_str() {
            "fake" => {
                if cfg!(not(debug_assertions)) {
                    warn!("fake token codec issues unsigned tokens");
                }
                Arc::new(FakeTokenCodec::new())
            }
            other => return Err(anyhow::anyhow!("Unknown token codec: {}", other)),
        };

        let allocator: Arc<dyn IdAllocator> = Arc::new(SequenceAllocator::new(
            mutex,
            store.clone(),
            SequenceConfig {
                lock_name: settings.sequence.lock_name.clone(),
                counter_prefix: settings.sequence.counter_prefix.clone(),
                ..SequenceConfig::default()
            },
        ));
        let tokens: Arc<dyn TokenLifecycle> = Arc::new(StoreTokenLifecycle::new(store));

        let account_config = AccountConfig::new(
            Duration::from_secs(settings.auth.access_ttl_secs),
            Duration::from_secs(settings.auth.refresh_ttl_secs),
        )?;
        let account_service: Arc<dyn AccountService> = Arc::new(RealAccountService::new(
            allocator.clone(),
            tokens,
            token_codec,
            account_config,
        ));

        info!(backend = %settings.store.backend, "server started");

        Ok(Self {
            allocator,
            account_service,
            root: OpContext::background(),
            request_timeout: Duration::from_millis(settings.request.timeout_ms),
            process_local: settings.store.backend == "memory",
        })
    }

    /// Context for one request, bounded by the configured timeout and
    /// cancelled with the server.
    pub fn request_context(&self) -> OpContext {
        self.root.child_with_timeout(self.request_timeout)
    }

    /// `count` concurrent allocations for `day`, each under its own request
    /// context. Failures cross the same boundary as the account flow.
    pub async fn allocate_many(
        self: &Arc<Self>,
        day: NaiveDate,
        count: usize,
    ) -> Result<Vec<SequentialId>, AccountError> {
        let tasks = (0..count).map(|_| {
            let server = self.clone();
            tokio::spawn(async move {
                let ctx = server.request_context();
                server.allocator.allocate(&ctx, day).await
            })
        });
        let mut ids = Vec::with_capacity(count);
        for joined in join_all(tasks).await {
            let allocated = joined.map_err(AccountError::internal)?;
            ids.push(allocated?);
        }
        ids.sort();
        Ok(ids)
    }

    /// True when tokens and counters die with this process.
    pub fn is_process_local(&self) -> bool {
        self.process_local
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.root.cancel_token()
    }

    /// Cancels every request still in flight.
    pub fn shutdown(&self) {
        info!("server shutting down...");
        self.root.cancel_token().cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::parse_settings;

    async fn memory_server() -> Server {
        let settings =
            parse_settings(Some(concat!(env!("CARGO_MANIFEST_DIR"), "/settings/dev.toml")))
                .unwrap();
        Server::try_new(&settings).await.unwrap()
    }

    #[tokio::test]
    async fn request_context_is_bounded_by_the_request_timeout() {
        let server = memory_server().await;
        let ctx = server.request_context();
        let deadline = ctx.deadline().unwrap();
        assert!(deadline <= tokio::time::Instant::now() + Duration::from_millis(100));
        assert!(server.is_process_local());
    }

    #[tokio::test]
    async fn shutdown_cancels_requests_in_flight() {
        let server = memory_server().await;
        let ctx = server.request_context();
        let registered = server.account_service.register(&ctx).await;
        assert!(registered.is_ok());

        server.shutdown();
        assert!(ctx.cancel_token().is_cancelled());
        assert!(matches!(
            server.account_service.register(&server.request_context()).await,
            Err(AccountError::Internal)
        ));
        assert!(matches!(
            server.allocator.allocate_today(&ctx).await,
            Err(AllocError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn allocate_many_returns_a_sorted_gap_free_batch() {
        let server = Arc::new(memory_server().await);
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let ids = server.allocate_many(day, 5).await.unwrap();

        let seqs: Vec<u64> = ids.iter().map(|id| id.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn allocate_many_failures_are_opaque() {
        let server = Arc::new(memory_server().await);
        server.shutdown();

        let err = server
            .allocate_many(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 3)
            .await
            .unwrap_err();

        assert!(matches!(err, AccountError::Internal));
        assert_eq!(err.to_string(), "internal server error");
    }
}
