//! Administrative routes, mounted under `/api/admin` behind the `admin` role gate.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use gatekeeper_auth::AuthService;
use gatekeeper_core::IdentityId;

use crate::app::errors;

pub fn router() -> Router {
    Router::new()
        .route("/identities/:id/sessions", get(identity_sessions))
        .route("/maintenance/purge", post(purge))
}

/// GET /api/admin/identities/:id/sessions - renewal credentials of one identity
pub async fn identity_sessions(
    Extension(auth): Extension<Arc<AuthService>>,
    Path(id): Path<String>,
) -> Response {
    let id = match id.parse::<IdentityId>() {
        Ok(id) => id,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
    };
    match auth.sessions_overview(id).await {
        Ok(overview) => Json(overview).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

/// POST /api/admin/maintenance/purge - run the janitor now
pub async fn purge(Extension(auth): Extension<Arc<AuthService>>) -> Response {
    match auth.purge().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}
