//! PostgreSQL credential store.
//!
//! ## Error mapping
//!
//! | SQLx error | PostgreSQL code | `StoreError` |
//! |------------|-----------------|--------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | any | `Storage` |
//! | PoolClosed / other | n/a | `Storage` |
//!
//! ## Rotation
//!
//! `replace_token` runs a conditional `UPDATE` (still unrevoked, not expired)
//! and the replacement `INSERT` in one transaction. Under READ COMMITTED a
//! second transaction racing on the same token blocks on the row lock, then
//! re-evaluates the predicate against the committed row and updates nothing.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;

use gatekeeper_auth::{CredentialStore, NewRenewalCredential, RenewalCredential, StoreError};
use gatekeeper_core::{CredentialId, IdentityId};

const COLUMNS: &str = "id, identity_id, token, expires_at, is_revoked, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresCredentialStore {
    pool: Arc<PgPool>,
}

impl PostgresCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    #[instrument(skip(self, credential), fields(identity_id = %credential.identity_id), err)]
    async fn create(&self, credential: NewRenewalCredential) -> Result<RenewalCredential, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO refresh_tokens (identity_id, token, expires_at) VALUES ($1, $2, $3) RETURNING {COLUMNS}"
        ))
        .bind(credential.identity_id.get())
        .bind(&credential.token)
        .bind(credential.expires_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create", e))?;

        credential_from_row(&row)
    }

    #[instrument(skip(self, token), err)]
    async fn find_by_token(&self, token: &str) -> Result<Option<RenewalCredential>, StoreError> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM refresh_tokens WHERE token = $1"))
            .bind(token)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_token", e))?;

        row.as_ref().map(credential_from_row).transpose()
    }

    #[instrument(skip(self), fields(identity_id = %identity_id), err)]
    async fn find_by_identity(&self, identity_id: IdentityId) -> Result<Vec<RenewalCredential>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM refresh_tokens WHERE identity_id = $1 ORDER BY id DESC"
        ))
        .bind(identity_id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_identity", e))?;

        rows.iter().map(credential_from_row).collect()
    }

    #[instrument(skip(self, token), err)]
    async fn revoke_token(&self, token: &str) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE refresh_tokens SET is_revoked = TRUE, updated_at = NOW() WHERE token = $1 AND is_revoked = FALSE",
        )
        .bind(token)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("revoke_token", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(identity_id = %identity_id), err)]
    async fn revoke_all_for_identity(&self, identity_id: IdentityId) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE refresh_tokens SET is_revoked = TRUE, updated_at = NOW() WHERE identity_id = $1 AND is_revoked = FALSE",
        )
        .bind(identity_id.get())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("revoke_all_for_identity", e))?;
        Ok(())
    }

    #[instrument(skip(self, old_token, replacement), fields(identity_id = %replacement.identity_id), err)]
    async fn replace_token(
        &self,
        old_token: &str,
        replacement: NewRenewalCredential,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let revoked = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_revoked = TRUE, updated_at = NOW()
            WHERE token = $1 AND is_revoked = FALSE AND expires_at >= $2
            "#,
        )
        .bind(old_token)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("revoke_superseded", e))?;

        if revoked.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback_transaction", e))?;
            return Ok(false);
        }

        sqlx::query("INSERT INTO refresh_tokens (identity_id, token, expires_at) VALUES ($1, $2, $3)")
            .bind(replacement.identity_id.get())
            .bind(&replacement.token)
            .bind(replacement.expires_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_replacement", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(true)
    }

    #[instrument(skip(self), err)]
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_expired", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self), err)]
    async fn delete_revoked(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE is_revoked = TRUE")
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_revoked", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(identity_id = %identity_id), err)]
    async fn count_active_for_identity(&self, identity_id: IdentityId) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM refresh_tokens WHERE identity_id = $1 AND is_revoked = FALSE",
        )
        .bind(identity_id.get())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_active_for_identity", e))?;
        Ok(count.max(0) as u64)
    }
}

fn credential_from_row(row: &sqlx::postgres::PgRow) -> Result<RenewalCredential, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Storage(format!("failed to decode refresh token row: {e}"));
    Ok(RenewalCredential {
        id: CredentialId::new(row.try_get("id").map_err(decode)?),
        identity_id: IdentityId::new(row.try_get("identity_id").map_err(decode)?),
        token: row.try_get("token").map_err(decode)?,
        expires_at: row.try_get("expires_at").map_err(decode)?,
        is_revoked: row.try_get("is_revoked").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    })
}

pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code() {
                Some(code) if code.as_ref() == "23505" => StoreError::Conflict(msg),
                _ => StoreError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Storage(format!("connection pool closed in {operation}")),
        _ => StoreError::Storage(format!("sqlx error in {operation}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use sqlx::PgPool;

    use gatekeeper_auth::{IdentityDirectory, NewIdentity, Role};

    use super::*;
    use crate::{PostgresIdentityDirectory, ensure_schema};

    /// A bootstrapped pool when `DATABASE_URL` is set; `None` skips the test.
    async fn test_pool() -> Option<PgPool> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let pool = PgPool::connect(&url).await.expect("DATABASE_URL is reachable");
        ensure_schema(&pool).await.expect("schema bootstrap");
        Some(pool)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_replace_token_has_exactly_one_winner() {
        let Some(pool) = test_pool().await else {
            eprintln!("DATABASE_URL not set; skipping");
            return;
        };
        let store = PostgresCredentialStore::new(pool.clone());
        let directory = PostgresIdentityDirectory::new(pool);
        let now = Utc::now();

        let seed = NewRenewalCredential::generate(IdentityId::new(0), now, Duration::hours(1)).unwrap();
        let suffix = seed.token[..12].to_string();
        let owner = directory
            .create(NewIdentity {
                name: format!("race-{suffix}"),
                email: format!("race-{suffix}@example.com"),
                role: Role::USER,
                password_hash: "unused".to_string(),
            })
            .await
            .unwrap();
        let original = store
            .create(NewRenewalCredential { identity_id: owner.id, ..seed })
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let token = original.token.clone();
            let owner_id = owner.id;
            tasks.push(tokio::spawn(async move {
                let replacement =
                    NewRenewalCredential::generate(owner_id, now, Duration::hours(1)).unwrap();
                store.replace_token(&token, replacement, now).await
            }));
        }

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap().unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(store.count_active_for_identity(owner.id).await.unwrap(), 1);
        assert!(store.find_by_token(&original.token).await.unwrap().unwrap().is_revoked);
    }
}
