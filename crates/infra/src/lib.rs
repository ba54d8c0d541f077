//! Infrastructure layer: storage adapters and background work.

pub mod credential_store;
pub mod identity_directory;
pub mod janitor_runner;
pub mod schema;

pub use credential_store::{InMemoryCredentialStore, PostgresCredentialStore};
pub use identity_directory::{InMemoryIdentityDirectory, PostgresIdentityDirectory};
pub use janitor_runner::{JanitorRunner, JanitorRunnerHandle, RunnerStatus};
pub use schema::ensure_schema;
