use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use gatekeeper_auth::{
    AuthError, AuthService, GateError, IdentityContext, Role, authorize, explain_authorization,
};

use crate::app::errors;

#[derive(Clone)]
pub struct AuthState {
    pub auth: Arc<AuthService>,
}

/// Reject the request unless it carries a valid, unexpired bearer credential.
pub async fn require_auth(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let context = authorization_header(req.headers())
        .and_then(|header| state.auth.gate().authenticate(header))
        .map_err(errors::gate_error_to_response)?;

    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}

/// Attach an identity when one can be established; never rejects.
pub async fn optional_auth(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let context = authorization_header(req.headers())
        .ok()
        .and_then(|header| state.auth.gate().authenticate_optional(header));

    if let Some(context) = context {
        req.extensions_mut().insert(context);
    }
    next.run(req).await
}

/// Role gate; must run inside [`require_auth`].
pub async fn require_role(
    State(required): State<Role>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let Some(context) = req.extensions().get::<IdentityContext>() else {
        return Err(errors::gate_error_to_response(GateError::MissingHeader));
    };

    if let Err(e) = authorize(context, &required) {
        let explanation = explain_authorization(context, &required);
        debug!(identity_id = %context.identity_id, reason = %explanation.reason, "role check denied");
        return Err(errors::auth_error_to_response(AuthError::from(e)));
    }

    Ok(next.run(req).await)
}

/// `None` when absent; a non-UTF-8 value is malformed.
fn authorization_header(headers: &HeaderMap) -> Result<Option<&str>, GateError> {
    headers
        .get(AUTHORIZATION)
        .map(|value| value.to_str().map_err(|_| GateError::MalformedHeader))
        .transpose()
}
