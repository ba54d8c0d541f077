//! Failure taxonomy of the authentication core.

use thiserror::Error;

use crate::{AuthzError, CredentialError, GateError, PasswordError, StoreError, TokenError};

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Bad request shape (missing or empty fields).
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Renewal token unknown to the store.
    #[error("refresh token not found")]
    NotFound,

    /// Renewal token expired or revoked; the two are deliberately not told apart.
    #[error("refresh token is invalid or expired")]
    InvalidOrExpired,

    #[error("refresh token does not belong to this identity")]
    IdentityMismatch,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// Access credential expired (signature still valid).
    #[error("token expired")]
    Expired,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    /// Duplicate email or name at registration.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Persistence failure; fatal to the request, not to the process.
    #[error("store failure: {0}")]
    StoreFailure(String),

    /// Signing key, randomness or hashing failure.
    #[error("crypto failure: {0}")]
    Crypto(String),
}

impl From<StoreError> for AuthError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => AuthError::Conflict(msg),
            StoreError::Storage(msg) => AuthError::StoreFailure(msg),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::InvalidSignature => AuthError::InvalidSignature,
            TokenError::Malformed(msg) => AuthError::MalformedToken(msg),
            TokenError::SigningKey(msg) => AuthError::Crypto(msg),
        }
    }
}

impl From<GateError> for AuthError {
    fn from(value: GateError) -> Self {
        match value {
            GateError::MissingHeader => AuthError::Unauthorized("missing bearer token".to_string()),
            GateError::MalformedHeader => {
                AuthError::Unauthorized("malformed authorization header".to_string())
            }
            GateError::InvalidSignature => AuthError::InvalidSignature,
            GateError::Malformed(msg) => AuthError::MalformedToken(msg),
            GateError::Expired => AuthError::Expired,
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(value: PasswordError) -> Self {
        AuthError::Crypto(value.to_string())
    }
}

impl From<CredentialError> for AuthError {
    fn from(value: CredentialError) -> Self {
        AuthError::Crypto(value.to_string())
    }
}
