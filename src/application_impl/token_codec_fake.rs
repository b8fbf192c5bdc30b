use crate::application_port::*;
use crate::domain_model::SubjectId;
use chrono::{DateTime, Utc};

const ACCESS_PREFIX: &str = "fake-access-token:";
const REFRESH_PREFIX: &str = "fake-refresh-token:";

/// Unsigned, human-readable tokens for development and tests. Anyone can
/// forge these; a signing codec belongs in front of real traffic.
#[derive(Debug, Default)]
pub struct FakeTokenCodec;

impl FakeTokenCodec {
    pub fn new() -> Self {
        Self
    }
}

fn parse_expiry(millis: &str) -> Result<DateTime<Utc>, CodecError> {
    let millis: i64 = millis.parse().map_err(|_| CodecError::TokenInvalid)?;
    let expires_at = DateTime::from_timestamp_millis(millis).ok_or(CodecError::TokenInvalid)?;
    if expires_at <= Utc::now() {
        return Err(CodecError::TokenExpired);
    }
    Ok(expires_at)
}

// Layout: <prefix><ids...>:<expiry millis>:<subject>. Subject goes last so it
// may contain ':'.
#[async_trait::async_trait]
impl TokenCodec for FakeTokenCodec {
    async fn encode_access(&self, claims: &AccessClaims) -> Result<String, CodecError> {
        Ok(format!(
            "{}{}:{}:{}:{}",
            ACCESS_PREFIX,
            claims.access_id,
            claims.refresh_id,
            claims.expires_at.timestamp_millis(),
            claims.subject_id
        ))
    }

    async fn encode_refresh(&self, claims: &RefreshClaims) -> Result<String, CodecError> {
        Ok(format!(
            "{}{}:{}:{}",
            REFRESH_PREFIX,
            claims.refresh_id,
            claims.expires_at.timestamp_millis(),
            claims.subject_id
        ))
    }

    async fn decode_access(&self, token: &str) -> Result<AccessClaims, CodecError> {
        let body = token
            .strip_prefix(ACCESS_PREFIX)
            .ok_or(CodecError::TokenInvalid)?;
        let mut parts = body.splitn(4, ':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(access_id), Some(refresh_id), Some(exp), Some(subject))
                if !access_id.is_empty() && !refresh_id.is_empty() && !subject.is_empty() =>
            {
                Ok(AccessClaims {
                    access_id: access_id.to_string(),
                    refresh_id: refresh_id.to_string(),
                    expires_at: parse_expiry(exp)?,
                    subject_id: SubjectId::from(subject),
                })
            }
            _ => Err(CodecError::TokenInvalid),
        }
    }

    async fn decode_refresh(&self, token: &str) -> Result<RefreshClaims, CodecError> {
        let body = token
            .strip_prefix(REFRESH_PREFIX)
            .ok_or(CodecError::TokenInvalid)?;
        let mut parts = body.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(refresh_id), Some(exp), Some(subject))
                if !refresh_id.is_empty() && !subject.is_empty() =>
            {
                Ok(RefreshClaims {
                    refresh_id: refresh_id.to_string(),
                    expires_at: parse_expiry(exp)?,
                    subject_id: SubjectId::from(subject),
                })
            }
            _ => Err(CodecError::TokenInvalid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn access_claims_survive_encoding() {
        let codec = FakeTokenCodec::new();
        let claims = AccessClaims {
            access_id: "a-1".to_string(),
            refresh_id: "r-1".to_string(),
            subject_id: SubjectId::from("tenant:42"),
            expires_at: DateTime::from_timestamp_millis(
                (Utc::now() + Duration::minutes(5)).timestamp_millis(),
            )
            .unwrap(),
        };

        let token = codec.encode_access(&claims).await.unwrap();
        assert_eq!(codec.decode_access(&token).await.unwrap(), claims);
    }

    #[tokio::test]
    async fn expired_refresh_token_is_rejected() {
        let codec = FakeTokenCodec::new();
        let token = codec
            .encode_refresh(&RefreshClaims {
                refresh_id: "r-1".to_string(),
                subject_id: SubjectId::from("u1"),
                expires_at: Utc::now() - Duration::seconds(1),
            })
            .await
            .unwrap();

        assert!(matches!(
            codec.decode_refresh(&token).await,
            Err(CodecError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn foreign_strings_are_invalid() {
        let codec = FakeTokenCodec::new();
        assert!(matches!(
            codec.decode_access("Bearer abc").await,
            Err(CodecError::TokenInvalid)
        ));
        assert!(matches!(
            codec.decode_refresh("fake-refresh-token:only-id").await,
            Err(CodecError::TokenInvalid)
        ));
        // an access token is not a refresh token
        assert!(matches!(
            codec.decode_refresh("fake-access-token:a:r:1:u").await,
            Err(CodecError::TokenInvalid)
        ));
    }
}
