use crate::application_port::*;
use crate::domain_model::*;
use anyhow::anyhow;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct AccountConfig {
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl AccountConfig {
    /// The refresh half has to outlive the access half.
    pub fn new(access_ttl: Duration, refresh_ttl: Duration) -> anyhow::Result<Self> {
        if access_ttl.is_zero() {
            return Err(anyhow!("access token ttl must be positive"));
        }
        if refresh_ttl <= access_ttl {
            return Err(anyhow!(
                "refresh token ttl ({:?}) must exceed access token ttl ({:?})",
                refresh_ttl,
                access_ttl
            ));
        }
        Ok(Self {
            access_ttl,
            refresh_ttl,
        })
    }
}

pub struct RealAccountService {
    allocator: Arc<dyn IdAllocator>,
    tokens: Arc<dyn TokenLifecycle>,
    token_codec: Arc<dyn TokenCodec>,
    config: AccountConfig,
}

impl RealAccountService {
    pub fn new(
        allocator: Arc<dyn IdAllocator>,
        tokens: Arc<dyn TokenLifecycle>,
        token_codec: Arc<dyn TokenCodec>,
        config: AccountConfig,
    ) -> Self {
        Self {
            allocator,
            tokens,
            token_codec,
            config,
        }
    }

    #[inline]
    fn new_token_id() -> String {
        Uuid::new_v4().to_string()
    }
}

#[async_trait::async_trait]
impl AccountService for RealAccountService {
    async fn register(&self, ctx: &OpContext) -> Result<SubjectId, AccountError> {
        let id = self.allocator.allocate_today(ctx).await?;
        info!(subject = %id, "subject registered");
        Ok(SubjectId(id.to_string()))
    }

    async fn login(
        &self,
        ctx: &OpContext,
        subject_id: &SubjectId,
    ) -> Result<TokenDetails, AccountError> {
        let now = Utc::now();
        let access_id = Self::new_token_id();
        let refresh_id = Self::new_token_id();
        let access_expires_at = now + self.config.access_ttl;
        let refresh_expires_at = now + self.config.refresh_ttl;

        let access_token = self
            .token_codec
            .encode_access(&AccessClaims {
                access_id: access_id.clone(),
                refresh_id: refresh_id.clone(),
                subject_id: subject_id.clone(),
                expires_at: access_expires_at,
            })
            .await?;
        let refresh_token = self
            .token_codec
            .encode_refresh(&RefreshClaims {
                refresh_id: refresh_id.clone(),
                subject_id: subject_id.clone(),
                expires_at: refresh_expires_at,
            })
            .await?;

        let details = TokenDetails {
            access_token,
            refresh_token,
            access_id,
            refresh_id,
            access_expires_at,
            refresh_expires_at,
        };
        self.tokens.create_auth(ctx, subject_id, &details).await?;

        info!(subject = %subject_id, access_id = %details.access_id, "token pair issued");
        Ok(details)
    }

    async fn authenticate(
        &self,
        ctx: &OpContext,
        access_token: &str,
    ) -> Result<AccessDetails, AccountError> {
        let claims = self.token_codec.decode_access(access_token).await?;
        let subject_id = self.tokens.fetch_auth(ctx, &claims.access_id).await?;

        if subject_id != claims.subject_id {
            warn!(access_id = %claims.access_id, "token subject does not match stored subject");
            return Err(AccountError::Unauthorized);
        }

        Ok(AccessDetails {
            access_id: claims.access_id,
            refresh_id: claims.refresh_id,
            subject_id,
        })
    }

    async fn logout(&self, ctx: &OpContext, access_token: &str) -> Result<(), AccountError> {
        let access = self.authenticate(ctx, access_token).await?;
        self.tokens.delete_tokens(ctx, &access).await?;
        info!(subject = %access.subject_id, access_id = %access.access_id, "logged out");
        Ok(())
    }

    async fn refresh(
        &self,
        ctx: &OpContext,
        refresh_token: &str,
    ) -> Result<TokenDetails, AccountError> {
        let claims = self.token_codec.decode_refresh(refresh_token).await?;
        let subject_id = self.tokens.fetch_auth(ctx, &claims.refresh_id).await?;
        if subject_id != claims.subject_id {
            warn!(refresh_id = %claims.refresh_id, "token subject does not match stored subject");
            return Err(AccountError::Unauthorized);
        }

        // Rotation: only the caller that actually removes the entry proceeds.
        let removed = self.tokens.delete_refresh(ctx, &claims.refresh_id).await?;
        if removed != 1 {
            return Err(AccountError::Unauthorized);
        }

        self.login(ctx, &subject_id).await
    }
}
