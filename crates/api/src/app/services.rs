use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;
use tracing::{info, warn};

use gatekeeper_auth::{AuthService, CredentialStore, IdentityDirectory};
use gatekeeper_core::{Clock, SystemClock};
use gatekeeper_infra::{
    InMemoryCredentialStore, InMemoryIdentityDirectory, PostgresCredentialStore,
    PostgresIdentityDirectory, ensure_schema,
};

use crate::config::AppConfig;

/// Pick storage adapters and wire the authentication service.
pub async fn build_auth_service(config: &AppConfig) -> anyhow::Result<Arc<AuthService>> {
    let (store, directory): (Arc<dyn CredentialStore>, Arc<dyn IdentityDirectory>) =
        match &config.database_url {
            Some(url) => {
                let pool = PgPool::connect(url)
                    .await
                    .context("failed to connect to Postgres")?;
                ensure_schema(&pool)
                    .await
                    .context("failed to bootstrap schema")?;
                info!("using PostgreSQL stores");
                (
                    Arc::new(PostgresCredentialStore::new(pool.clone())),
                    Arc::new(PostgresIdentityDirectory::new(pool)),
                )
            }
            None => {
                warn!("DATABASE_URL not set; using in-memory stores");
                (
                    Arc::new(InMemoryCredentialStore::new()),
                    Arc::new(InMemoryIdentityDirectory::new()),
                )
            }
        };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    Ok(Arc::new(AuthService::new(
        Arc::new(config.auth.clone()),
        store,
        directory,
        clock,
    )))
}
