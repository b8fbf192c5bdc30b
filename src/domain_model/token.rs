use super::SubjectId;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of a successful authentication: the opaque token pair plus the
/// store identifiers and absolute expiries of each half.
#[derive(Debug, Clone, Serialize)]
pub struct TokenDetails {
    pub access_token: String,
    pub refresh_token: String,
    pub access_id: String,
    pub refresh_id: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

impl TokenDetails {
    /// The refresh half must outlive the access half.
    pub fn is_well_formed(&self) -> bool {
        self.refresh_expires_at > self.access_expires_at
    }
}

/// Per-request view of a validated access token.
///
/// `refresh_id` comes from the access token payload, so paired revocation
/// removes the refresh entry that was actually written at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDetails {
    pub access_id: String,
    pub refresh_id: String,
    pub subject_id: SubjectId,
}
