use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gatekeeper_core::IdentityId;

use crate::{Identity, Role};

/// Claims carried by an access credential.
///
/// Timestamps are whole seconds since the Unix epoch, as on the JWT wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub user_id: IdentityId,
    pub username: String,
    pub email: String,
    pub role: Role,

    /// Unique token id; distinguishes credentials minted in the same instant.
    pub jti: String,

    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub iss: String,

    /// Subject (the identity's display name).
    pub sub: String,
}

impl AccessClaims {
    pub fn issued_at(&self) -> DateTime<Utc> {
        from_epoch(self.iat)
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        from_epoch(self.nbf)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        from_epoch(self.exp)
    }

    /// Strict expiry: a credential whose `expires_at` equals `now` is still live.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at() < now
    }

    /// Seconds until expiry, floored at zero.
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at() - now).num_seconds().max(0)
    }

    pub fn identity(&self) -> Identity {
        Identity {
            id: self.user_id,
            name: self.username.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }
}

// Out-of-range timestamps collapse to the earliest instant, which reads as expired.
fn from_epoch(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use proptest::prelude::*;

    use super::*;

    fn claims_expiring_at(exp: DateTime<Utc>) -> AccessClaims {
        AccessClaims {
            user_id: IdentityId::new(1),
            username: "alice".into(),
            email: "alice@example.com".into(),
            role: Role::USER,
            jti: "jti".into(),
            iat: exp.timestamp() - 900,
            nbf: exp.timestamp() - 900,
            exp: exp.timestamp(),
            iss: "gatekeeper".into(),
            sub: "alice".into(),
        }
    }

    #[test]
    fn expiry_is_strict() {
        let exp = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let claims = claims_expiring_at(exp);
        assert!(!claims.is_expired(exp));
        assert!(claims.is_expired(exp + Duration::seconds(1)));
        assert!(!claims.is_expired(exp - Duration::seconds(1)));
    }

    #[test]
    fn remaining_ttl_floors_at_zero() {
        let exp = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let claims = claims_expiring_at(exp);
        assert_eq!(claims.remaining_ttl(exp - Duration::seconds(30)), 30);
        assert_eq!(claims.remaining_ttl(exp + Duration::seconds(30)), 0);
    }

    #[test]
    fn out_of_range_timestamp_reads_as_expired() {
        let mut claims = claims_expiring_at(Utc::now());
        claims.exp = i64::MAX;
        assert!(claims.is_expired(Utc::now()));
    }

    proptest! {
        /// Once expired, a credential stays expired at every later instant.
        #[test]
        fn expiry_is_monotonic(offset in -100_000i64..100_000, later in 0i64..100_000) {
            let exp = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
            let claims = claims_expiring_at(exp);
            let now = exp + Duration::seconds(offset);
            if claims.is_expired(now) {
                prop_assert!(claims.is_expired(now + Duration::seconds(later)));
            }
            prop_assert_eq!(claims.remaining_ttl(now) == 0, offset >= 0);
        }
    }
}
