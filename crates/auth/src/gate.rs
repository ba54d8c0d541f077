//! Access gate: turns an `Authorization` header into an identity context.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use gatekeeper_core::{Clock, IdentityId};

use crate::{AccessClaims, Role, TokenCodec, TokenError};

pub const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("missing authorization header")]
    MissingHeader,

    #[error("authorization header is not a bearer credential")]
    MalformedHeader,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token expired")]
    Expired,
}

impl From<TokenError> for GateError {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::InvalidSignature => GateError::InvalidSignature,
            TokenError::Malformed(msg) => GateError::Malformed(msg),
            // Unreachable on the verify path; treat as an unverifiable credential.
            TokenError::SigningKey(_) => GateError::InvalidSignature,
        }
    }
}

/// The authenticated caller for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityContext {
    pub identity_id: IdentityId,
    pub name: String,
    pub email: String,
    pub role: Role,

    #[serde(skip)]
    pub claims: AccessClaims,
}

impl IdentityContext {
    fn from_claims(claims: AccessClaims) -> Self {
        Self {
            identity_id: claims.user_id,
            name: claims.username.clone(),
            email: claims.email.clone(),
            role: claims.role.clone(),
            claims,
        }
    }
}

/// Strip the `Bearer ` scheme from a raw header value.
pub fn parse_bearer(header: &str) -> Result<&str, GateError> {
    let token = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(GateError::MalformedHeader)?
        .trim();
    if token.is_empty() {
        return Err(GateError::MalformedHeader);
    }
    Ok(token)
}

pub struct AccessGate {
    codec: Arc<TokenCodec>,
    clock: Arc<dyn Clock>,
}

impl AccessGate {
    pub fn new(codec: Arc<TokenCodec>, clock: Arc<dyn Clock>) -> Self {
        Self { codec, clock }
    }

    /// Authenticate a raw `Authorization` header value (`None` when absent).
    pub fn authenticate(&self, header: Option<&str>) -> Result<IdentityContext, GateError> {
        let header = header.ok_or(GateError::MissingHeader)?;
        self.authenticate_token(parse_bearer(header)?)
    }

    /// Verify a bare access token and check it against the clock.
    pub fn authenticate_token(&self, token: &str) -> Result<IdentityContext, GateError> {
        let claims = self.codec.verify(token)?;
        let now = self.clock.now();
        if claims.is_expired(now) {
            return Err(GateError::Expired);
        }
        tracing::trace!(
            identity_id = %claims.user_id,
            remaining_secs = claims.remaining_ttl(now),
            "access credential accepted"
        );
        Ok(IdentityContext::from_claims(claims))
    }

    /// Like [`authenticate`](Self::authenticate), but every failure degrades
    /// to "no identity".
    pub fn authenticate_optional(&self, header: Option<&str>) -> Option<IdentityContext> {
        match self.authenticate(header) {
            Ok(context) => Some(context),
            Err(GateError::MissingHeader) => None,
            Err(e) => {
                tracing::debug!(error = %e, "ignoring unusable optional credential");
                None
            }
        }
    }
}
