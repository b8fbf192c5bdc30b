use crate::domain_model::*;
use chrono::NaiveDate;

#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    #[error("lock unavailable: {0}")]
    LockUnavailable(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    /// The counter was advanced but the lock could not be released, so
    /// `unconfirmed` must not be treated as safely issued.
    #[error("lock release failed after allocating {unconfirmed}: {reason}")]
    LockReleaseFailed { unconfirmed: String, reason: String },
    #[error("operation cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl From<Interrupted> for AllocError {
    fn from(interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::Cancelled => AllocError::Cancelled,
            Interrupted::DeadlineExceeded => AllocError::DeadlineExceeded,
        }
    }
}

#[async_trait::async_trait]
pub trait IdAllocator: Send + Sync {
    /// Mint the next identifier for `day`. Never retried internally: a blind
    /// retry may advance the counter twice.
    async fn allocate(&self, ctx: &OpContext, day: NaiveDate) -> Result<SequentialId, AllocError>;

    async fn allocate_today(&self, ctx: &OpContext) -> Result<SequentialId, AllocError> {
        self.allocate(ctx, chrono::Local::now().date_naive()).await
    }
}
