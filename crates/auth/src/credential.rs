//! Renewal credentials: long-lived, opaque, persisted and single-use.
//!
//! Lifecycle of one row:
//!
//! ```text
//! issued --(rotate success)--> revoked (superseded)
//! issued --(revoke one/all)--> revoked (explicit)
//! issued --(ttl elapsed)-----> logically expired, row kept until purged
//! revoked | expired --(janitor)--> deleted
//! ```
//!
//! Nothing ever moves a row back to `issued`.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use gatekeeper_core::{CredentialId, IdentityId};

/// Random bytes per renewal token (hex-encoded to twice as many characters).
pub const RENEWAL_TOKEN_BYTES: usize = 32;

/// A persisted renewal credential row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenewalCredential {
    pub id: CredentialId,
    pub identity_id: IdentityId,
    #[serde(skip_serializing)]
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub is_revoked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RenewalCredential {
    /// Strict expiry, same rule as access credentials.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Valid iff neither expired nor revoked.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now) && !self.is_revoked
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("random source unavailable: {0}")]
    Entropy(#[from] getrandom::Error),

    #[error("renewal ttl out of range")]
    ExpiryOutOfRange,
}

/// A renewal credential to be inserted; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRenewalCredential {
    pub identity_id: IdentityId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl NewRenewalCredential {
    /// A fresh, unguessable credential for `identity_id` valid for `ttl` from `now`.
    pub fn generate(
        identity_id: IdentityId,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self, CredentialError> {
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or(CredentialError::ExpiryOutOfRange)?;
        Ok(Self {
            identity_id,
            token: generate_renewal_token()?,
            expires_at,
        })
    }
}

/// 32 bytes from the OS CSPRNG, lowercase hex (64 characters).
pub fn generate_renewal_token() -> Result<String, getrandom::Error> {
    let mut bytes = [0u8; RENEWAL_TOKEN_BYTES];
    getrandom::getrandom(&mut bytes)?;
    Ok(hex::encode(bytes))
}
