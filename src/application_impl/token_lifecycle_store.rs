use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// [`TokenLifecycle`] keeping one store entry per token half, keyed by the
/// half's own identifier with the subject as value.
pub struct StoreTokenLifecycle {
    store: Arc<dyn ExpiringStore>,
}

impl StoreTokenLifecycle {
    pub fn new(store: Arc<dyn ExpiringStore>) -> Self {
        Self { store }
    }

    /// Time left until `until`; zero once it has passed.
    fn remaining(until: DateTime<Utc>) -> Duration {
        (until - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }

    async fn write(
        &self,
        ctx: &OpContext,
        key: &str,
        subject_id: &SubjectId,
        ttl: Duration,
    ) -> Result<bool, TokenError> {
        if ttl.is_zero() {
            warn!(key, "token entry written with an expiry already in the past");
        }
        let inserted = ctx
            .run(self.store.set(key, subject_id.as_str(), ttl))
            .await?
            .map_err(|e| TokenError::StoreUnavailable(e.to_string()))?;
        Ok(inserted)
    }

    async fn remove(&self, ctx: &OpContext, key: &str) -> Result<u64, TokenError> {
        let removed = ctx
            .run(self.store.del(&[key]))
            .await?
            .map_err(|e| TokenError::StoreUnavailable(e.to_string()))?;
        Ok(removed)
    }
}

#[async_trait::async_trait]
impl TokenLifecycle for StoreTokenLifecycle {
    async fn create_auth(
        &self,
        ctx: &OpContext,
        subject_id: &SubjectId,
        details: &TokenDetails,
    ) -> Result<(), TokenError> {
        let access_ttl = Self::remaining(details.access_expires_at);
        let refresh_ttl = Self::remaining(details.refresh_expires_at);

        let access_ok = self
            .write(ctx, &details.access_id, subject_id, access_ttl)
            .await?;
        let refresh_ok = self
            .write(ctx, &details.refresh_id, subject_id, refresh_ttl)
            .await?;

        if !access_ok {
            return Err(TokenError::StoreWriteFailed {
                key: details.access_id.clone(),
            });
        }
        if !refresh_ok {
            return Err(TokenError::StoreWriteFailed {
                key: details.refresh_id.clone(),
            });
        }

        debug!(
            subject = %subject_id,
            access_id = %details.access_id,
            refresh_id = %details.refresh_id,
            "token pair recorded"
        );
        Ok(())
    }

    async fn fetch_auth(&self, ctx: &OpContext, access_id: &str) -> Result<SubjectId, TokenError> {
        let value = ctx
            .run(self.store.get(access_id))
            .await?
            .map_err(|e| TokenError::StoreUnavailable(e.to_string()))?;
        value.map(SubjectId).ok_or(TokenError::NotFound)
    }

    async fn delete_tokens(
        &self,
        ctx: &OpContext,
        access: &AccessDetails,
    ) -> Result<(), TokenError> {
        let access_removed = self.remove(ctx, &access.access_id).await?;
        let refresh_removed = self.remove(ctx, &access.refresh_id).await?;

        if access_removed != 1 || refresh_removed != 1 {
            debug!(
                access_id = %access.access_id,
                access_removed,
                refresh_removed,
                "paired revocation incomplete"
            );
            return Err(TokenError::RevocationIncomplete {
                access_removed,
                refresh_removed,
            });
        }
        debug!(access_id = %access.access_id, "token pair revoked");
        Ok(())
    }

    async fn delete_refresh(&self, ctx: &OpContext, refresh_id: &str) -> Result<u64, TokenError> {
        let removed = self.remove(ctx, refresh_id).await?;
        debug!(refresh_id, removed, "refresh entry revoked");
        Ok(removed)
    }
}
