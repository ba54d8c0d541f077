//! Token codec: mints and verifies signed, self-contained access credentials.
//!
//! Stateless given the shared config; pure CPU work, never suspends.
//! `verify` checks signature and structure only. Expiry is the separate
//! [`AccessClaims::is_expired`] predicate, so "valid but stale" and "invalid"
//! stay distinguishable.

use std::collections::HashSet;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use thiserror::Error;

use crate::{AccessClaims, AuthConfig, Identity};

const ALGORITHM: Algorithm = Algorithm::HS256;
const ALGORITHM_NAME: &str = "HS256";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Wrong key, wrong algorithm, unsigned or tampered material.
    #[error("invalid token signature")]
    InvalidSignature,

    #[error("malformed token: {0}")]
    Malformed(String),

    /// The signing key or access TTL is unusable (fatal configuration error).
    #[error("signing key unavailable: {0}")]
    SigningKey(String),
}

pub struct TokenCodec {
    config: Arc<AuthConfig>,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(config: Arc<AuthConfig>) -> Self {
        let encoding = EncodingKey::from_secret(config.signing_secret());
        let decoding = DecodingKey::from_secret(config.signing_secret());

        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            config,
            encoding,
            decoding,
            validation,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Mint an access credential for `identity`, valid from `now` for the
    /// configured access TTL.
    pub fn issue(&self, identity: &Identity, now: DateTime<Utc>) -> Result<String, TokenError> {
        if self.config.signing_secret().is_empty() {
            return Err(TokenError::SigningKey("signing secret is empty".to_string()));
        }

        let expires_at = now
            .checked_add_signed(self.config.access_ttl)
            .ok_or_else(|| TokenError::SigningKey("access ttl out of range".to_string()))?;
        let issued_at = now.timestamp();
        let claims = AccessClaims {
            user_id: identity.id,
            username: identity.name.clone(),
            email: identity.email.clone(),
            role: identity.role.clone(),
            jti: uuid::Uuid::now_v7().to_string(),
            iat: issued_at,
            nbf: issued_at,
            exp: expires_at.timestamp(),
            iss: self.config.issuer.clone(),
            sub: identity.name.clone(),
        };

        jsonwebtoken::encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(|e| TokenError::SigningKey(e.to_string()))
    }

    /// Verify signature and structure, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
        // Reject any declared algorithm other than ours, `none` included,
        // before the library gets a chance to treat it as a parse failure.
        if let Some(alg) = declared_algorithm(token)
            && alg != ALGORITHM_NAME
        {
            return Err(TokenError::InvalidSignature);
        }

        jsonwebtoken::decode::<AccessClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(map_jwt_error)
    }
}

fn declared_algorithm(token: &str) -> Option<String> {
    let header = token.split('.').next()?;
    let bytes = URL_SAFE_NO_PAD.decode(header).ok()?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    value.get("alg")?.as_str().map(str::to_owned)
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::InvalidKeyFormat => TokenError::InvalidSignature,
        _ => TokenError::Malformed(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use gatekeeper_core::IdentityId;

    use super::*;
    use crate::Role;

    fn alice() -> Identity {
        Identity {
            id: IdentityId::new(1),
            name: "alice".into(),
            email: "alice@example.com".into(),
            role: Role::USER,
        }
    }

    fn codec(secret: &str) -> TokenCodec {
        TokenCodec::new(Arc::new(AuthConfig::new(secret)))
    }

    #[test]
    fn round_trip_preserves_identity() {
        let codec = codec("test-secret");
        let now = Utc::now();
        let token = codec.issue(&alice(), now).unwrap();

        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.identity(), alice());
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.iss, "gatekeeper");
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.nbf, claims.iat);
        assert_eq!(claims.exp - claims.iat, 900);
        assert!(!claims.is_expired(now));
    }

    #[test]
    fn same_instant_tokens_differ() {
        let codec = codec("test-secret");
        let now = Utc::now();
        let a = codec.issue(&alice(), now).unwrap();
        let b = codec.issue(&alice(), now).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_is_invalid_signature() {
        let token = codec("key-one").issue(&alice(), Utc::now()).unwrap();
        assert_eq!(codec("key-two").verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn tampered_payload_is_invalid_signature() {
        let codec = codec("test-secret");
        let token = codec.issue(&alice(), Utc::now()).unwrap();
        let mut parts: Vec<String> = token.split('.').map(str::to_owned).collect();

        let mut payload: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(&parts[1]).unwrap()).unwrap();
        payload["role"] = serde_json::json!("admin");
        parts[1] = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap());

        assert_eq!(codec.verify(&parts.join(".")), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn unsigned_token_is_invalid_signature() {
        let codec = codec("test-secret");
        let token = codec.issue(&alice(), Utc::now()).unwrap();
        let payload = token.split('.').nth(1).unwrap();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);

        let unsigned = format!("{header}.{payload}.");
        assert_eq!(codec.verify(&unsigned), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn other_hmac_algorithm_is_invalid_signature() {
        let secret = "test-secret";
        let codec = codec(secret);
        let now = Utc::now();
        let claims = codec.verify(&codec.issue(&alice(), now).unwrap()).unwrap();

        let hs512 = jsonwebtoken::encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();
        assert_eq!(codec.verify(&hs512), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = codec("test-secret");
        assert!(matches!(codec.verify("not-a-token"), Err(TokenError::Malformed(_))));
        assert!(matches!(codec.verify(""), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn stale_but_signed_token_still_verifies() {
        let codec = codec("test-secret");
        let issued = Utc::now() - Duration::hours(2);
        let token = codec.issue(&alice(), issued).unwrap();

        let claims = codec.verify(&token).unwrap();
        assert!(claims.is_expired(Utc::now()));
    }

    #[test]
    fn oversized_access_ttl_is_an_error() {
        let config =
            AuthConfig::new("test-secret").with_access_ttl(Duration::seconds(10_000_000_000_000));
        let codec = TokenCodec::new(Arc::new(config));
        assert_eq!(
            codec.issue(&alice(), Utc::now()),
            Err(TokenError::SigningKey("access ttl out of range".to_string()))
        );
    }

    #[test]
    fn empty_secret_cannot_sign() {
        let codec = codec("");
        assert!(matches!(codec.issue(&alice(), Utc::now()), Err(TokenError::SigningKey(_))));
    }
}
