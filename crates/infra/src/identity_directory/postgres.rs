use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use gatekeeper_auth::{IdentityDirectory, IdentityRecord, NewIdentity, Role, StoreError};
use gatekeeper_core::IdentityId;

use crate::credential_store::postgres::map_sqlx_error;

const COLUMNS: &str = "id, name, email, role, password_hash, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresIdentityDirectory {
    pool: Arc<PgPool>,
}

impl PostgresIdentityDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    async fn fetch_one_where(&self, operation: &str, column: &str, value: &str) -> Result<Option<IdentityRecord>, StoreError> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM identities WHERE {column} = $1"))
            .bind(value)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        row.as_ref().map(identity_from_row).transpose()
    }

    async fn exists_where(&self, operation: &str, column: &str, value: &str) -> Result<bool, StoreError> {
        sqlx::query_scalar(&format!("SELECT EXISTS(SELECT 1 FROM identities WHERE {column} = $1)"))
            .bind(value)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))
    }
}

#[async_trait]
impl IdentityDirectory for PostgresIdentityDirectory {
    #[instrument(skip(self, identity), fields(name = %identity.name), err)]
    async fn create(&self, identity: NewIdentity) -> Result<IdentityRecord, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO identities (name, email, role, password_hash) VALUES ($1, $2, $3, $4) RETURNING {COLUMNS}"
        ))
        .bind(&identity.name)
        .bind(&identity.email)
        .bind(identity.role.as_str())
        .bind(&identity.password_hash)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| match unique_violation_column(&e) {
            Some(column) => StoreError::Conflict(format!("{column} already exists")),
            None => map_sqlx_error("create_identity", e),
        })?;

        identity_from_row(&row)
    }

    #[instrument(skip(self), fields(identity_id = %id), err)]
    async fn get_by_id(&self, id: IdentityId) -> Result<Option<IdentityRecord>, StoreError> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM identities WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_identity_by_id", e))?;

        row.as_ref().map(identity_from_row).transpose()
    }

    #[instrument(skip(self, email), err)]
    async fn get_by_email(&self, email: &str) -> Result<Option<IdentityRecord>, StoreError> {
        self.fetch_one_where("get_identity_by_email", "email", email).await
    }

    #[instrument(skip(self, email), err)]
    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError> {
        self.exists_where("exists_by_email", "email", email).await
    }

    #[instrument(skip(self), err)]
    async fn exists_by_name(&self, name: &str) -> Result<bool, StoreError> {
        self.exists_where("exists_by_name", "name", name).await
    }
}

/// `email` / `name` for a unique violation on the identities table.
fn unique_violation_column(err: &sqlx::Error) -> Option<&'static str> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    if db_err.code().as_deref() != Some("23505") {
        return None;
    }
    match db_err.constraint() {
        Some(c) if c.contains("email") => Some("email"),
        Some(c) if c.contains("name") => Some("name"),
        _ => Some("identity"),
    }
}

fn identity_from_row(row: &sqlx::postgres::PgRow) -> Result<IdentityRecord, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Storage(format!("failed to decode identity row: {e}"));
    let role: String = row.try_get("role").map_err(decode)?;
    Ok(IdentityRecord {
        id: IdentityId::new(row.try_get("id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        email: row.try_get("email").map_err(decode)?,
        role: Role::from(role),
        password_hash: row.try_get("password_hash").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    })
}
