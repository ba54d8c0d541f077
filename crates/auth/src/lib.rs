//! `gatekeeper-auth`: token-based authentication core.
//!
//! Access credentials are short-lived HS256 JWTs; renewal credentials are
//! opaque, persisted and single-use. This crate is decoupled from HTTP and
//! from any particular storage engine.

pub mod authorize;
pub mod claims;
pub mod codec;
pub mod config;
pub mod credential;
pub mod error;
pub mod gate;
pub mod identity;
pub mod janitor;
pub mod password;
pub mod roles;
pub mod rotation;
pub mod service;
pub mod session;
pub mod store;

pub use authorize::{AuthorizationExplanation, AuthzError, authorize, explain_authorization};
pub use claims::AccessClaims;
pub use codec::{TokenCodec, TokenError};
pub use config::AuthConfig;
pub use credential::{CredentialError, NewRenewalCredential, RenewalCredential};
pub use error::{AuthError, AuthResult};
pub use gate::{AccessGate, GateError, IdentityContext, parse_bearer};
pub use identity::{Identity, IdentityRecord, NewIdentity};
pub use janitor::{Janitor, PurgeReport};
pub use password::PasswordError;
pub use roles::{Role, RoleError, RoleInfo};
pub use rotation::RotationManager;
pub use service::{
    AuthService, LoginRequest, LogoutRequest, ProfileResponse, RefreshTokenRequest,
    RegisterRequest, SessionsOverview, TokenResponse, ValidateTokenResponse,
};
pub use session::{SessionBundle, SessionIssuer};
pub use store::{CredentialStore, IdentityDirectory, StoreError};
