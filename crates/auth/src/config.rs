//! Authentication configuration.
//!
//! Built once at process start and shared read-only (`Arc<AuthConfig>`) by the
//! codec, the issuer and the services.

use chrono::Duration;
use tracing::warn;

pub const ENV_SECRET_KEY: &str = "JWT_SECRET_KEY";
pub const ENV_ACCESS_TTL: &str = "JWT_ACCESS_TOKEN_DURATION";
pub const ENV_REFRESH_TTL: &str = "JWT_REFRESH_TOKEN_DURATION";
pub const ENV_ISSUER: &str = "JWT_ISSUER";

pub const DEFAULT_SECRET_KEY: &str = "insecure-dev-secret-change-me";
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 900;
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 604_800;
pub const DEFAULT_ISSUER: &str = "gatekeeper";

/// Longest TTL accepted from the environment (ten years).
pub const MAX_TTL_SECS: i64 = 10 * 366 * 24 * 60 * 60;

#[derive(Clone)]
pub struct AuthConfig {
    signing_secret: Vec<u8>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub issuer: String,
}

impl core::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("signing_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl AuthConfig {
    /// Config with default TTLs and issuer.
    pub fn new(signing_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            access_ttl: Duration::seconds(DEFAULT_ACCESS_TTL_SECS),
            refresh_ttl: Duration::seconds(DEFAULT_REFRESH_TTL_SECS),
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Read the config from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AuthConfig::from_env`], with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = match lookup(ENV_SECRET_KEY).filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                warn!("{ENV_SECRET_KEY} not set; using insecure dev default");
                DEFAULT_SECRET_KEY.to_string()
            }
        };

        let issuer = lookup(ENV_ISSUER)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ISSUER.to_string());

        Self {
            signing_secret: secret.into_bytes(),
            access_ttl: ttl_or_default(&lookup, ENV_ACCESS_TTL, DEFAULT_ACCESS_TTL_SECS),
            refresh_ttl: ttl_or_default(&lookup, ENV_REFRESH_TTL, DEFAULT_REFRESH_TTL_SECS),
            issuer,
        }
    }

    pub fn signing_secret(&self) -> &[u8] {
        &self.signing_secret
    }

    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl.num_seconds()
    }
}

fn ttl_or_default<F>(lookup: &F, key: &str, default: i64) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Duration::seconds(default);
    };
    let parsed = raw
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|secs| (1..=MAX_TTL_SECS).contains(secs))
        .and_then(Duration::try_seconds);
    match parsed {
        Some(ttl) => ttl,
        None => {
            warn!(key, value = %raw, default, max = MAX_TTL_SECS, "invalid duration; using default");
            Duration::seconds(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = AuthConfig::from_lookup(lookup_from(&[]));
        assert_eq!(cfg.signing_secret(), DEFAULT_SECRET_KEY.as_bytes());
        assert_eq!(cfg.access_ttl_seconds(), 900);
        assert_eq!(cfg.refresh_ttl, Duration::seconds(604_800));
        assert_eq!(cfg.issuer, DEFAULT_ISSUER);
    }

    #[test]
    fn reads_overrides() {
        let cfg = AuthConfig::from_lookup(lookup_from(&[
            (ENV_SECRET_KEY, "s3cret"),
            (ENV_ACCESS_TTL, "60"),
            (ENV_REFRESH_TTL, "3600"),
            (ENV_ISSUER, "acme"),
        ]));
        assert_eq!(cfg.signing_secret(), b"s3cret");
        assert_eq!(cfg.access_ttl_seconds(), 60);
        assert_eq!(cfg.refresh_ttl, Duration::seconds(3600));
        assert_eq!(cfg.issuer, "acme");
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let cfg = AuthConfig::from_lookup(lookup_from(&[
            (ENV_ACCESS_TTL, "soon"),
            (ENV_REFRESH_TTL, "-5"),
        ]));
        assert_eq!(cfg.access_ttl_seconds(), DEFAULT_ACCESS_TTL_SECS);
        assert_eq!(cfg.refresh_ttl.num_seconds(), DEFAULT_REFRESH_TTL_SECS);
    }

    #[test]
    fn out_of_range_numbers_fall_back() {
        let cfg = AuthConfig::from_lookup(lookup_from(&[
            (ENV_ACCESS_TTL, "99999999999999999"),
            (ENV_REFRESH_TTL, "10000000000000"),
        ]));
        assert_eq!(cfg.access_ttl_seconds(), DEFAULT_ACCESS_TTL_SECS);
        assert_eq!(cfg.refresh_ttl.num_seconds(), DEFAULT_REFRESH_TTL_SECS);
    }

    #[test]
    fn upper_bound_is_inclusive() {
        let max = MAX_TTL_SECS.to_string();
        let cfg = AuthConfig::from_lookup(lookup_from(&[(ENV_REFRESH_TTL, max.as_str())]));
        assert_eq!(cfg.refresh_ttl.num_seconds(), MAX_TTL_SECS);
    }

    #[test]
    fn debug_redacts_secret() {
        let cfg = AuthConfig::new("do-not-print");
        assert!(!format!("{cfg:?}").contains("do-not-print"));
    }
}
