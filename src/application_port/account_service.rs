use crate::application_port::*;
use crate::domain_model::*;
use std::fmt::Display;
use tracing::warn;

/// What callers of the account flow get to see. Store and lock details are
/// logged, never returned.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("internal server error")]
    Internal,
}

impl AccountError {
    pub fn internal<E: Display>(error: E) -> AccountError {
        warn!("Internal error: {}", error);
        AccountError::Internal
    }
}

impl From<TokenError> for AccountError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::NotFound => AccountError::Unauthorized,
            TokenError::RevocationIncomplete { .. } => AccountError::Unauthorized,
            e => AccountError::internal(e),
        }
    }
}

impl From<CodecError> for AccountError {
    fn from(error: CodecError) -> Self {
        match error {
            CodecError::TokenInvalid => AccountError::Unauthorized,
            CodecError::TokenExpired => AccountError::Unauthorized,
        }
    }
}

impl From<AllocError> for AccountError {
    fn from(error: AllocError) -> Self {
        AccountError::internal(error)
    }
}

#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    /// Mint an identifier for a new subject.
    async fn register(&self, ctx: &OpContext) -> Result<SubjectId, AccountError>;
    async fn login(&self, ctx: &OpContext, subject_id: &SubjectId)
    -> Result<TokenDetails, AccountError>;
    async fn authenticate(
        &self,
        ctx: &OpContext,
        access_token: &str,
    ) -> Result<AccessDetails, AccountError>;
    async fn logout(&self, ctx: &OpContext, access_token: &str) -> Result<(), AccountError>;
    async fn refresh(&self, ctx: &OpContext, refresh_token: &str)
    -> Result<TokenDetails, AccountError>;
}
