//! Wire-facing operations: register, login, refresh, logout, validate, profile.
//!
//! `AuthService` wires the issuer, rotation manager, gate and janitor around
//! one configuration object, one credential store and one identity directory.
//! It has no HTTP knowledge; the API layer maps [`AuthError`] to responses.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use gatekeeper_core::{Clock, IdentityId};

use crate::{
    AccessGate, AuthConfig, AuthError, AuthResult, CredentialStore, GateError, IdentityContext,
    IdentityDirectory, Janitor, NewIdentity, PurgeReport, RenewalCredential, Role, RotationManager,
    SessionBundle, SessionIssuer, TokenCodec, gate::BEARER_PREFIX, password,
};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

impl From<SessionBundle> for TokenResponse {
    fn from(bundle: SessionBundle) -> Self {
        Self {
            access_token: bundle.access_token,
            refresh_token: bundle.refresh_token,
            expires_in: bundle.expires_in,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: IdentityId,
    pub username: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateTokenResponse {
    pub valid: bool,
    pub user_id: IdentityId,
    pub username: String,
    pub email: String,
    pub role: Role,
}

/// Renewal credentials of one identity, for administrative views.
#[derive(Debug, Clone, Serialize)]
pub struct SessionsOverview {
    pub identity_id: IdentityId,
    pub active: u64,
    pub credentials: Vec<RenewalCredential>,
}

pub struct AuthService {
    directory: Arc<dyn IdentityDirectory>,
    issuer: Arc<SessionIssuer>,
    rotation: RotationManager,
    gate: AccessGate,
    janitor: Arc<Janitor>,
}

impl AuthService {
    pub fn new(
        config: Arc<AuthConfig>,
        store: Arc<dyn CredentialStore>,
        directory: Arc<dyn IdentityDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let codec = Arc::new(TokenCodec::new(config));
        let issuer = Arc::new(SessionIssuer::new(codec.clone(), store.clone(), clock.clone()));

        Self {
            directory,
            rotation: RotationManager::new(issuer.clone(), store.clone()),
            gate: AccessGate::new(codec, clock.clone()),
            janitor: Arc::new(Janitor::new(store, clock)),
            issuer,
        }
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    pub fn janitor(&self) -> Arc<Janitor> {
        self.janitor.clone()
    }

    pub async fn register(&self, req: RegisterRequest) -> AuthResult<TokenResponse> {
        let name = required("name", &req.name)?;
        let email = required("email", &req.email)?;
        if req.password.is_empty() {
            return Err(AuthError::MalformedInput("password is required".to_string()));
        }

        if self.directory.exists_by_email(email).await? {
            return Err(AuthError::Conflict("email already exists".to_string()));
        }
        if self.directory.exists_by_name(name).await? {
            return Err(AuthError::Conflict("name already exists".to_string()));
        }

        let record = self
            .directory
            .create(NewIdentity {
                name: name.to_string(),
                email: email.to_string(),
                role: Role::default_for_new_identity(),
                password_hash: password::hash_password(&req.password)?,
            })
            .await?;
        info!(identity_id = %record.id, "identity registered");

        Ok(self.issuer.issue_session(&record.identity()).await?.into())
    }

    pub async fn login(&self, req: LoginRequest) -> AuthResult<TokenResponse> {
        let email = required("email", &req.email)?;
        if req.password.is_empty() {
            return Err(AuthError::MalformedInput("password is required".to_string()));
        }

        let record = self
            .directory
            .get_by_email(email)
            .await?
            .ok_or_else(|| AuthError::Unauthorized("user not found".to_string()))?;

        if !password::verify_password(&record.password_hash, &req.password) {
            return Err(AuthError::Unauthorized("invalid password".to_string()));
        }

        Ok(self.issuer.issue_session(&record.identity()).await?.into())
    }

    /// Rotate a renewal credential.
    ///
    /// With an authenticated `caller` the credential must belong to them;
    /// otherwise the stored owner is the rotating identity.
    pub async fn refresh_token(
        &self,
        req: RefreshTokenRequest,
        caller: Option<&IdentityContext>,
    ) -> AuthResult<TokenResponse> {
        let token = required("refresh_token", &req.refresh_token)?;

        let identity_id = match caller {
            Some(ctx) => ctx.identity_id,
            None => self.rotation.lookup(token).await?.identity_id,
        };

        let record = self
            .directory
            .get_by_id(identity_id)
            .await?
            .ok_or_else(|| AuthError::Unauthorized("user not found".to_string()))?;

        Ok(self.rotation.rotate(token, &record.identity()).await?.into())
    }

    pub async fn logout(&self, req: LogoutRequest) -> AuthResult<()> {
        let token = required("refresh_token", &req.refresh_token)?;
        self.rotation.revoke_one(token).await
    }

    pub async fn logout_all(&self, caller: &IdentityContext) -> AuthResult<()> {
        self.rotation.revoke_all(caller.identity_id).await
    }

    /// Inspect a raw `Authorization` value; the `Bearer ` scheme is optional here.
    pub fn validate_token(&self, header: Option<&str>) -> AuthResult<ValidateTokenResponse> {
        let header = header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(GateError::MissingHeader)?;
        let token = header.strip_prefix(BEARER_PREFIX).unwrap_or(header).trim();

        let ctx = self.gate.authenticate_token(token)?;
        Ok(ValidateTokenResponse {
            valid: true,
            user_id: ctx.identity_id,
            username: ctx.name,
            email: ctx.email,
            role: ctx.role,
        })
    }

    pub fn get_profile(&self, caller: &IdentityContext) -> ProfileResponse {
        ProfileResponse {
            id: caller.identity_id,
            username: caller.name.clone(),
            email: caller.email.clone(),
            role: caller.role.clone(),
        }
    }

    pub async fn active_sessions(&self, identity_id: IdentityId) -> AuthResult<u64> {
        self.rotation.active_sessions(identity_id).await
    }

    pub async fn sessions_overview(&self, identity_id: IdentityId) -> AuthResult<SessionsOverview> {
        Ok(SessionsOverview {
            identity_id,
            active: self.rotation.active_sessions(identity_id).await?,
            credentials: self.rotation.sessions(identity_id).await?,
        })
    }

    pub async fn purge(&self) -> AuthResult<PurgeReport> {
        self.janitor.purge_all().await
    }
}

fn required<'a>(field: &str, value: &'a str) -> AuthResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AuthError::MalformedInput(format!("{field} is required")));
    }
    Ok(trimmed)
}
