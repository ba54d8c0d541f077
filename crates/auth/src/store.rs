//! Persistence contracts consumed by the authentication core.
//!
//! Implementations live in the infrastructure layer (in-memory for tests/dev,
//! PostgreSQL for production). Every call is a suspension point; the core
//! never retries and never holds application-level locks around them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use gatekeeper_core::IdentityId;

use crate::{IdentityRecord, NewIdentity, NewRenewalCredential, RenewalCredential};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other storage failure (connection, query, decoding).
    #[error("storage error: {0}")]
    Storage(String),
}

/// Renewal credential persistence.
///
/// ## Implementation requirements
///
/// - `token` is unique across all rows.
/// - `revoke_*` only ever set `is_revoked`; they never un-revoke.
/// - `replace_token` is atomic: the old row is revoked and the replacement is
///   inserted in one transaction, and only when the old row is still valid at
///   `now`. Two concurrent calls for the same old token must not both succeed.
/// - `delete_*` only remove rows already outside the valid set, so they are
///   safe to run concurrently with issuance and rotation.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn create(&self, credential: NewRenewalCredential) -> Result<RenewalCredential, StoreError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<RenewalCredential>, StoreError>;

    async fn find_by_identity(&self, identity_id: IdentityId) -> Result<Vec<RenewalCredential>, StoreError>;

    /// No-op when the token does not exist.
    async fn revoke_token(&self, token: &str) -> Result<(), StoreError>;

    async fn revoke_all_for_identity(&self, identity_id: IdentityId) -> Result<(), StoreError>;

    /// Revoke `old_token` and insert `replacement`, atomically.
    ///
    /// Returns `Ok(false)` without writing anything when `old_token` is
    /// missing, revoked or expired at `now`.
    async fn replace_token(
        &self,
        old_token: &str,
        replacement: NewRenewalCredential,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Delete rows with `expires_at < now`; returns the number removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Delete rows with `is_revoked = true`; returns the number removed.
    async fn delete_revoked(&self) -> Result<u64, StoreError>;

    /// Rows owned by `identity_id` that are not revoked.
    async fn count_active_for_identity(&self, identity_id: IdentityId) -> Result<u64, StoreError>;
}

/// Identity lookup, owned by the user-directory collaborator.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn create(&self, identity: NewIdentity) -> Result<IdentityRecord, StoreError>;

    async fn get_by_id(&self, id: IdentityId) -> Result<Option<IdentityRecord>, StoreError>;

    async fn get_by_email(&self, email: &str) -> Result<Option<IdentityRecord>, StoreError>;

    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError>;

    async fn exists_by_name(&self, name: &str) -> Result<bool, StoreError>;
}
