//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: storage selection and `AuthService` construction
//! - `routes/`: HTTP routes + handlers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    Extension, Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower::ServiceBuilder;

use gatekeeper_auth::{AuthService, Role};

use crate::{config::AppConfig, middleware};

pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router from process configuration.
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let auth = services::build_auth_service(config).await?;
    Ok(router(auth))
}

/// Router over an already-wired service (used by `main.rs` and tests).
pub fn router(auth: Arc<AuthService>) -> Router {
    let auth_state = middleware::AuthState { auth: auth.clone() };

    let admin = routes::admin::router().layer(from_fn_with_state(Role::ADMIN, middleware::require_role));

    // Protected routes: require a valid access credential.
    let protected = Router::new()
        .nest("/api/auth", routes::auth::protected_router())
        .nest("/api/admin", admin)
        .layer(from_fn_with_state(auth_state.clone(), middleware::require_auth));

    // Identity enriches but is not required.
    let optional = Router::new()
        .route("/auth/refresh", post(routes::auth::refresh))
        .layer(from_fn_with_state(auth_state, middleware::optional_auth));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::auth::public_router())
        .merge(optional)
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(auth)))
}
