use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use gatekeeper_auth::{IdentityDirectory, IdentityRecord, NewIdentity, StoreError};
use gatekeeper_core::{Clock, IdentityId, SystemClock};

/// In-memory identity directory for tests/dev. Ids start at 1.
pub struct InMemoryIdentityDirectory {
    records: RwLock<Vec<IdentityRecord>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryIdentityDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentityDirectory {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            clock,
        }
    }

    fn find<P>(&self, predicate: P) -> Result<Option<IdentityRecord>, StoreError>
    where
        P: Fn(&IdentityRecord) -> bool,
    {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Storage("identity directory lock poisoned".to_string()))?;
        Ok(records.iter().find(|r| predicate(r)).cloned())
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryIdentityDirectory {
    async fn create(&self, identity: NewIdentity) -> Result<IdentityRecord, StoreError> {
        let now = self.clock.now();
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Storage("identity directory lock poisoned".to_string()))?;

        if records.iter().any(|r| r.email == identity.email) {
            return Err(StoreError::Conflict("email already exists".to_string()));
        }
        if records.iter().any(|r| r.name == identity.name) {
            return Err(StoreError::Conflict("name already exists".to_string()));
        }

        let record = IdentityRecord {
            id: IdentityId::new(records.len() as i64 + 1),
            name: identity.name,
            email: identity.email,
            role: identity.role,
            password_hash: identity.password_hash,
            created_at: now,
            updated_at: now,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn get_by_id(&self, id: IdentityId) -> Result<Option<IdentityRecord>, StoreError> {
        self.find(|r| r.id == id)
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<IdentityRecord>, StoreError> {
        self.find(|r| r.email == email)
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.find(|r| r.email == email)?.is_some())
    }

    async fn exists_by_name(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.find(|r| r.name == name)?.is_some())
    }
}
