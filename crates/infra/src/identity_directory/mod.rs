//! Identity directory adapters.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryIdentityDirectory;
pub use postgres::PostgresIdentityDirectory;
