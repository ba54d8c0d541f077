use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use gatekeeper_auth::{CredentialStore, NewRenewalCredential, RenewalCredential, StoreError};
use gatekeeper_core::{Clock, CredentialId, IdentityId, SystemClock};

#[derive(Debug, Default)]
struct Rows {
    next_id: i64,
    by_token: HashMap<String, RenewalCredential>,
}

impl Rows {
    fn insert(&mut self, new: NewRenewalCredential, now: DateTime<Utc>) -> Result<RenewalCredential, StoreError> {
        if self.by_token.contains_key(&new.token) {
            return Err(StoreError::Conflict("refresh token already exists".to_string()));
        }
        self.next_id += 1;
        let row = RenewalCredential {
            id: CredentialId::new(self.next_id),
            identity_id: new.identity_id,
            token: new.token,
            expires_at: new.expires_at,
            is_revoked: false,
            created_at: now,
            updated_at: now,
        };
        self.by_token.insert(row.token.clone(), row.clone());
        Ok(row)
    }
}

/// In-memory credential store.
///
/// Intended for tests/dev. A single write lock covers each mutation, which
/// gives `replace_token` the same all-or-nothing behaviour as the SQL adapter.
pub struct InMemoryCredentialStore {
    rows: RwLock<Rows>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Row timestamps (`created_at`, `updated_at`) come from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            rows: RwLock::new(Rows::default()),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.read().map(|rows| rows.by_token.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Rows>, StoreError> {
        self.rows
            .read()
            .map_err(|_| StoreError::Storage("credential store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Rows>, StoreError> {
        self.rows
            .write()
            .map_err(|_| StoreError::Storage("credential store lock poisoned".to_string()))
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn create(&self, credential: NewRenewalCredential) -> Result<RenewalCredential, StoreError> {
        let now = self.clock.now();
        self.write()?.insert(credential, now)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RenewalCredential>, StoreError> {
        Ok(self.read()?.by_token.get(token).cloned())
    }

    async fn find_by_identity(&self, identity_id: IdentityId) -> Result<Vec<RenewalCredential>, StoreError> {
        let mut rows: Vec<RenewalCredential> = self
            .read()?
            .by_token
            .values()
            .filter(|row| row.identity_id == identity_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.id.get().cmp(&a.id.get()));
        Ok(rows)
    }

    async fn revoke_token(&self, token: &str) -> Result<(), StoreError> {
        let now = self.clock.now();
        if let Some(row) = self.write()?.by_token.get_mut(token) {
            if !row.is_revoked {
                row.is_revoked = true;
                row.updated_at = now;
            }
        }
        Ok(())
    }

    async fn revoke_all_for_identity(&self, identity_id: IdentityId) -> Result<(), StoreError> {
        let now = self.clock.now();
        for row in self.write()?.by_token.values_mut() {
            if row.identity_id == identity_id && !row.is_revoked {
                row.is_revoked = true;
                row.updated_at = now;
            }
        }
        Ok(())
    }

    async fn replace_token(
        &self,
        old_token: &str,
        replacement: NewRenewalCredential,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let stamp = self.clock.now();
        let mut rows = self.write()?;

        match rows.by_token.get(old_token) {
            Some(old) if old.is_valid(now) => {}
            _ => return Ok(false),
        }
        if rows.by_token.contains_key(&replacement.token) {
            return Err(StoreError::Conflict("refresh token already exists".to_string()));
        }

        if let Some(old) = rows.by_token.get_mut(old_token) {
            old.is_revoked = true;
            old.updated_at = stamp;
        }
        rows.insert(replacement, stamp)?;
        Ok(true)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut rows = self.write()?;
        let before = rows.by_token.len();
        rows.by_token.retain(|_, row| !row.is_expired(now));
        Ok((before - rows.by_token.len()) as u64)
    }

    async fn delete_revoked(&self) -> Result<u64, StoreError> {
        let mut rows = self.write()?;
        let before = rows.by_token.len();
        rows.by_token.retain(|_, row| !row.is_revoked);
        Ok((before - rows.by_token.len()) as u64)
    }

    async fn count_active_for_identity(&self, identity_id: IdentityId) -> Result<u64, StoreError> {
        Ok(self
            .read()?
            .by_token
            .values()
            .filter(|row| row.identity_id == identity_id && !row.is_revoked)
            .count() as u64)
    }
}
