use crate::domain_model::*;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("store did not confirm write of {key}")]
    StoreWriteFailed { key: String },
    #[error("token not found")]
    NotFound,
    #[error("revocation incomplete (access removed: {access_removed}, refresh removed: {refresh_removed})")]
    RevocationIncomplete {
        access_removed: u64,
        refresh_removed: u64,
    },
    #[error("operation cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl From<Interrupted> for TokenError {
    fn from(interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::Cancelled => TokenError::Cancelled,
            Interrupted::DeadlineExceeded => TokenError::DeadlineExceeded,
        }
    }
}

/// Bookkeeping of issued token pairs in the shared store. Token contents are
/// never inspected here.
#[async_trait::async_trait]
pub trait TokenLifecycle: Send + Sync {
    /// Persist both halves of the pair, each with its own TTL. The two writes
    /// are not atomic as a pair.
    async fn create_auth(
        &self,
        ctx: &OpContext,
        subject_id: &SubjectId,
        details: &TokenDetails,
    ) -> Result<(), TokenError>;

    async fn fetch_auth(&self, ctx: &OpContext, access_id: &str) -> Result<SubjectId, TokenError>;

    /// Revoke both halves. Anything other than exactly one removal per half
    /// is reported as [`TokenError::RevocationIncomplete`].
    async fn delete_tokens(&self, ctx: &OpContext, access: &AccessDetails)
    -> Result<(), TokenError>;

    /// Revoke a single entry. Idempotent: succeeds whether or not the entry
    /// still existed, and returns the number removed.
    async fn delete_refresh(&self, ctx: &OpContext, refresh_id: &str) -> Result<u64, TokenError>;
}
