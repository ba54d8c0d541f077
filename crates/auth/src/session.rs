//! Session issuer: pairs a fresh access credential with a persisted renewal
//! credential.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use gatekeeper_core::Clock;

use crate::{
    AuthResult, CredentialStore, Identity, NewRenewalCredential, TokenCodec,
};

/// An issued access/renewal pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionBundle {
    pub access_token: String,
    pub refresh_token: String,

    /// Access credential lifetime in seconds.
    pub expires_in: i64,

    #[serde(skip)]
    pub refresh_expires_at: DateTime<Utc>,
}

/// Credentials minted but not yet persisted.
pub(crate) struct Minted {
    pub access_token: String,
    pub renewal: NewRenewalCredential,
}

pub struct SessionIssuer {
    codec: Arc<TokenCodec>,
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
}

impl SessionIssuer {
    pub fn new(codec: Arc<TokenCodec>, store: Arc<dyn CredentialStore>, clock: Arc<dyn Clock>) -> Self {
        Self { codec, store, clock }
    }

    /// Issue a new session for `identity`.
    ///
    /// The store write is the only side effect; if it fails no bundle is
    /// returned and the already-minted access credential is dropped.
    pub async fn issue_session(&self, identity: &Identity) -> AuthResult<SessionBundle> {
        let now = self.clock.now();
        let minted = self.mint(identity, now)?;

        let stored = self.store.create(minted.renewal).await?;
        info!(identity_id = %identity.id, credential_id = %stored.id, "session issued");

        Ok(self.bundle(minted.access_token, stored.token, stored.expires_at))
    }

    pub(crate) fn mint(&self, identity: &Identity, now: DateTime<Utc>) -> AuthResult<Minted> {
        let access_token = self.codec.issue(identity, now)?;
        let renewal = NewRenewalCredential::generate(identity.id, now, self.codec.config().refresh_ttl)?;
        Ok(Minted { access_token, renewal })
    }

    pub(crate) fn bundle(
        &self,
        access_token: String,
        refresh_token: String,
        refresh_expires_at: DateTime<Utc>,
    ) -> SessionBundle {
        SessionBundle {
            access_token,
            refresh_token,
            expires_in: self.codec.config().access_ttl_seconds(),
            refresh_expires_at,
        }
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
