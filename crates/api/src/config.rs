//! Process configuration for the API binary.

use std::time::Duration;

use tracing::warn;

use gatekeeper_auth::AuthConfig;

pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_JANITOR_INTERVAL: &str = "JANITOR_INTERVAL_SECS";

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_JANITOR_INTERVAL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub auth: AuthConfig,
    pub bind_addr: String,
    /// PostgreSQL adapters when set, in-memory otherwise.
    pub database_url: Option<String>,
    pub janitor_interval: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let janitor_secs = match lookup(ENV_JANITOR_INTERVAL) {
            None => DEFAULT_JANITOR_INTERVAL_SECS,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    warn!(key = ENV_JANITOR_INTERVAL, value = %raw, "invalid interval; using default");
                    DEFAULT_JANITOR_INTERVAL_SECS
                }
            },
        };

        Self {
            auth: AuthConfig::from_lookup(&lookup),
            bind_addr: lookup(ENV_BIND_ADDR)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            database_url: lookup(ENV_DATABASE_URL).filter(|s| !s.trim().is_empty()),
            janitor_interval: Duration::from_secs(janitor_secs),
        }
    }
}
