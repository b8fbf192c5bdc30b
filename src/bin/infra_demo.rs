/// Exercises the Redis adapters against a live server.
///
/// ⚠️ Required for execution: a Redis reachable at `REDIS_DSN` below. The demo
/// writes keys under a random prefix and leaves them to expire.
///
/// $ cargo run --bin infra_demo
use chrono::{Local, Utc};
use futures_util::future::join_all;
use nanoid::nanoid;
use std::sync::Arc;
use std::time::Duration;
use tokenseq::application_impl::*;
use tokenseq::application_port::*;
use tokenseq::domain_model::*;
use tokenseq::domain_port::*;
use tokenseq::infra_redis::*;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::new("infra_demo=debug,tokenseq=debug");

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    let alphabet: [char; 16] = [
        '1', '2', '3', '4', '5', '6', '7', '8', '9', '0', 'a', 'b', 'c', 'd', 'e', 'f',
    ];
    let run_id = nanoid!(10, &alphabet);

    // region prepare connection

    const REDIS_DSN: &str = "redis://:mysecret@127.0.0.1:6379";
    let redis_client = redis::Client::open(REDIS_DSN)?;
    let mut redis_manager = redis_client.get_connection_manager().await?;

    let pong: String = redis::cmd("PING").query_async(&mut redis_manager).await?;
    println!("PING -> {}", pong);

    // endregion

    // region initialization

    let store: Arc<dyn ExpiringStore> = Arc::new(RedisExpiringStore::new(
        redis_manager.clone(),
        format!("demo:{}", run_id),
    ));
    let mutex: Arc<dyn MutexProvider> = Arc::new(RedisMutexProvider::new(
        redis_manager.clone(),
        format!("demo:{}:lock", run_id),
        RedisLockConfig::default(),
    ));
    let allocator = Arc::new(SequenceAllocator::new(
        mutex.clone(),
        store.clone(),
        SequenceConfig::default(),
    ));
    let tokens = StoreTokenLifecycle::new(store.clone());

    // endregion

    // region allocator

    let today = Local::now().date_naive();
    let handles = (0..20).map(|_| {
        let allocator = allocator.clone();
        tokio::spawn(async move {
            let ctx = OpContext::with_timeout(Duration::from_secs(5));
            allocator.allocate(&ctx, today).await
        })
    });
    let mut ids = Vec::new();
    for joined in join_all(handles).await {
        ids.push(joined??.to_string());
    }
    ids.sort();
    println!("allocated: {:?}", ids);

    // endregion

    // region token lifecycle

    let ctx = OpContext::with_timeout(Duration::from_secs(1));
    let now = Utc::now();
    let details = TokenDetails {
        access_token: "demo-access".to_string(),
        refresh_token: "demo-refresh".to_string(),
        access_id: uuid::Uuid::new_v4().to_string(),
        refresh_id: uuid::Uuid::new_v4().to_string(),
        access_expires_at: now + Duration::from_secs(2),
        refresh_expires_at: now + Duration::from_secs(4),
    };
    let subject = SubjectId::from("demo-user");
    tokens.create_auth(&ctx, &subject, &details).await?;
    println!(
        "fetch access -> {:?}",
        tokens.fetch_auth(&ctx, &details.access_id).await
    );

    tokio::time::sleep(Duration::from_secs(3)).await;
    let ctx = OpContext::with_timeout(Duration::from_secs(1));
    println!(
        "after 3s: access -> {:?}, refresh -> {:?}",
        tokens.fetch_auth(&ctx, &details.access_id).await,
        tokens.fetch_auth(&ctx, &details.refresh_id).await
    );

    let access = AccessDetails {
        access_id: details.access_id.clone(),
        refresh_id: details.refresh_id.clone(),
        subject_id: subject,
    };
    println!("delete_tokens -> {:?}", tokens.delete_tokens(&ctx, &access).await);
    println!(
        "delete_refresh twice -> {:?} {:?}",
        tokens.delete_refresh(&ctx, &details.refresh_id).await,
        tokens.delete_refresh(&ctx, &details.refresh_id).await
    );

    // endregion

    Ok(())
}
