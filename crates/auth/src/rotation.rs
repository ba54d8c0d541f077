//! Renewal credential lifecycle: single-use rotation and revocation.

use std::sync::Arc;

use tracing::{info, warn};

use gatekeeper_core::{Clock, IdentityId};

use crate::{
    AuthError, AuthResult, CredentialStore, Identity, RenewalCredential, SessionBundle,
    SessionIssuer,
};

pub struct RotationManager {
    issuer: Arc<SessionIssuer>,
    store: Arc<dyn CredentialStore>,
}

impl RotationManager {
    pub fn new(issuer: Arc<SessionIssuer>, store: Arc<dyn CredentialStore>) -> Self {
        Self { issuer, store }
    }

    pub async fn lookup(&self, renewal_token: &str) -> AuthResult<RenewalCredential> {
        self.store
            .find_by_token(renewal_token)
            .await?
            .ok_or(AuthError::NotFound)
    }

    /// Exchange a valid renewal credential held by `identity` for a new pair.
    ///
    /// Checks run in order: existence, validity, ownership. On success the
    /// presented credential is revoked and its replacement persisted in one
    /// store transaction; a concurrent rotation of the same credential loses
    /// with `InvalidOrExpired`.
    pub async fn rotate(&self, renewal_token: &str, identity: &Identity) -> AuthResult<SessionBundle> {
        let now = self.issuer.clock().now();
        let current = self.lookup(renewal_token).await?;

        if !current.is_valid(now) {
            warn!(credential_id = %current.id, revoked = current.is_revoked, "rotation of unusable credential rejected");
            return Err(AuthError::InvalidOrExpired);
        }
        if current.identity_id != identity.id {
            warn!(
                credential_id = %current.id,
                owner = %current.identity_id,
                caller = %identity.id,
                "rotation by non-owner rejected"
            );
            return Err(AuthError::IdentityMismatch);
        }

        let minted = self.issuer.mint(identity, now)?;
        let refresh_token = minted.renewal.token.clone();
        let refresh_expires_at = minted.renewal.expires_at;

        if !self.store.replace_token(renewal_token, minted.renewal, now).await? {
            warn!(credential_id = %current.id, "renewal credential consumed concurrently");
            return Err(AuthError::InvalidOrExpired);
        }

        info!(identity_id = %identity.id, previous_credential_id = %current.id, "session rotated");
        Ok(self.issuer.bundle(minted.access_token, refresh_token, refresh_expires_at))
    }

    /// Idempotent; unknown tokens are not an error.
    pub async fn revoke_one(&self, renewal_token: &str) -> AuthResult<()> {
        self.store.revoke_token(renewal_token).await?;
        Ok(())
    }

    /// Does not touch outstanding access credentials; they live until `exp`.
    pub async fn revoke_all(&self, identity_id: IdentityId) -> AuthResult<()> {
        self.store.revoke_all_for_identity(identity_id).await?;
        info!(identity_id = %identity_id, "all sessions revoked");
        Ok(())
    }

    pub async fn active_sessions(&self, identity_id: IdentityId) -> AuthResult<u64> {
        Ok(self.store.count_active_for_identity(identity_id).await?)
    }

    pub async fn sessions(&self, identity_id: IdentityId) -> AuthResult<Vec<RenewalCredential>> {
        Ok(self.store.find_by_identity(identity_id).await?)
    }
}
