//! Periodic removal of renewal credentials that can never validate again.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use gatekeeper_core::Clock;

use crate::{AuthResult, CredentialStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub expired: u64,
    pub revoked: u64,
}

impl PurgeReport {
    pub fn total(&self) -> u64 {
        self.expired + self.revoked
    }
}

pub struct Janitor {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
}

impl Janitor {
    pub fn new(store: Arc<dyn CredentialStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn purge_expired(&self) -> AuthResult<u64> {
        Ok(self.store.delete_expired(self.clock.now()).await?)
    }

    pub async fn purge_revoked(&self) -> AuthResult<u64> {
        Ok(self.store.delete_revoked().await?)
    }

    /// Expired first, then revoked. A failure in either aborts the pass.
    pub async fn purge_all(&self) -> AuthResult<PurgeReport> {
        let report = PurgeReport {
            expired: self.purge_expired().await?,
            revoked: self.purge_revoked().await?,
        };
        info!(expired = report.expired, revoked = report.revoked, "renewal credentials purged");
        Ok(report)
    }
}
