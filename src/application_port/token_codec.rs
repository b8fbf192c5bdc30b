use crate::domain_model::*;
use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("token invalid")]
    TokenInvalid,
    #[error("token expired")]
    TokenExpired,
}

/// Payload of an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    pub access_id: String,
    pub refresh_id: String,
    pub subject_id: SubjectId,
    pub expires_at: DateTime<Utc>,
}

/// Payload of a refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshClaims {
    pub refresh_id: String,
    pub subject_id: SubjectId,
    pub expires_at: DateTime<Utc>,
}

/// Encodes and decodes opaque token strings. Signing belongs to the codec
/// implementation; the token bookkeeping never parses tokens itself.
#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    async fn encode_access(&self, claims: &AccessClaims) -> Result<String, CodecError>;
    async fn encode_refresh(&self, claims: &RefreshClaims) -> Result<String, CodecError>;
    async fn decode_access(&self, token: &str) -> Result<AccessClaims, CodecError>;
    async fn decode_refresh(&self, token: &str) -> Result<RefreshClaims, CodecError>;
}
