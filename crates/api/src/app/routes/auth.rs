//! Authentication endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use gatekeeper_auth::{
    AuthService, IdentityContext, LoginRequest, LogoutRequest, RefreshTokenRequest,
    RegisterRequest,
};

use crate::app::errors;

/// `/auth/*` routes that need no credential.
pub fn public_router() -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/validate", post(validate))
}

/// Mounted under `/api/auth`, behind `require_auth`.
pub fn protected_router() -> Router {
    Router::new()
        .route("/profile", get(profile))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/logout-all", post(logout_all))
        .route("/validate", get(validate))
        .route("/sessions", get(sessions))
}

/// POST /auth/register
pub async fn register(
    Extension(auth): Extension<Arc<AuthService>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Response {
    let body = match errors::json_body(payload) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    match auth.register(body).await {
        Ok(tokens) => (StatusCode::CREATED, Json(tokens)).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

/// POST /auth/login
pub async fn login(
    Extension(auth): Extension<Arc<AuthService>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let body = match errors::json_body(payload) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    match auth.login(body).await {
        Ok(tokens) => Json(tokens).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

/// POST /auth/refresh (optional credential) and POST /api/auth/refresh (required).
///
/// When a caller identity is attached the renewal credential must be theirs.
pub async fn refresh(
    Extension(auth): Extension<Arc<AuthService>>,
    caller: Option<Extension<IdentityContext>>,
    payload: Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Response {
    let body = match errors::json_body(payload) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let caller = caller.map(|Extension(ctx)| ctx);
    match auth.refresh_token(body, caller.as_ref()).await {
        Ok(tokens) => Json(tokens).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

/// POST /api/auth/logout
pub async fn logout(
    Extension(auth): Extension<Arc<AuthService>>,
    payload: Result<Json<LogoutRequest>, JsonRejection>,
) -> Response {
    let body = match errors::json_body(payload) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    match auth.logout(body).await {
        Ok(()) => Json(json!({ "message": "logged out" })).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

/// POST /api/auth/logout-all
pub async fn logout_all(
    Extension(auth): Extension<Arc<AuthService>>,
    Extension(caller): Extension<IdentityContext>,
) -> Response {
    match auth.logout_all(&caller).await {
        Ok(()) => Json(json!({ "message": "all sessions revoked" })).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

/// POST /auth/validate and GET /api/auth/validate
pub async fn validate(Extension(auth): Extension<Arc<AuthService>>, headers: HeaderMap) -> Response {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    match auth.validate_token(header) {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

/// GET /api/auth/profile
pub async fn profile(
    Extension(auth): Extension<Arc<AuthService>>,
    Extension(caller): Extension<IdentityContext>,
) -> Response {
    Json(auth.get_profile(&caller)).into_response()
}

/// GET /api/auth/sessions
pub async fn sessions(
    Extension(auth): Extension<Arc<AuthService>>,
    Extension(caller): Extension<IdentityContext>,
) -> Response {
    match auth.active_sessions(caller.identity_id).await {
        Ok(active) => Json(json!({
            "identity_id": caller.identity_id,
            "active_sessions": active,
        }))
        .into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}
