use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use gatekeeper_auth::{
    AccessClaims, AuthConfig, AuthService, IdentityDirectory, NewIdentity, Role, password,
};
use gatekeeper_core::{IdentityId, SystemClock};
use gatekeeper_infra::{InMemoryCredentialStore, InMemoryIdentityDirectory};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

const JWT_SECRET: &str = "black-box-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let directory = Arc::new(InMemoryIdentityDirectory::new());
        directory
            .create(NewIdentity {
                name: "root".to_string(),
                email: "root@example.com".to_string(),
                role: Role::ADMIN,
                password_hash: password::hash_password("root-password").unwrap(),
            })
            .await
            .unwrap();

        let auth = Arc::new(AuthService::new(
            Arc::new(AuthConfig::new(JWT_SECRET)),
            Arc::new(InMemoryCredentialStore::new()),
            directory,
            Arc::new(SystemClock),
        ));

        Self::serve(gatekeeper_api::app::router(auth)).await
    }

    async fn serve(app: axum::Router) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn register(client: &reqwest::Client, srv: &TestServer, name: &str) -> Value {
    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({
            "name": name,
            "email": format!("{name}@example.com"),
            "password": "s3cret-pass",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

async fn login(client: &reqwest::Client, srv: &TestServer, email: &str, password: &str) -> reqwest::Response {
    client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .unwrap()
}

fn token(body: &Value, field: &str) -> String {
    body[field].as_str().unwrap().to_string()
}

async fn error_code(res: reqwest::Response) -> String {
    let body: Value = res.json().await.unwrap();
    body["error"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public_and_protected_routes_need_a_bearer() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url("/api/auth/profile")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(res).await, "missing_token");

    let res = client
        .get(srv.url("/api/auth/profile"))
        .header("Authorization", "Token abc")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(res).await, "malformed_authorization_header");

    let res = client
        .get(srv.url("/api/auth/profile"))
        .bearer_auth("not.a.jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(res).await, "token_invalid");
}

#[tokio::test]
async fn register_profile_refresh_replay_logout_all() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let first = register(&client, &srv, "alice").await;
    assert_eq!(first["expires_in"], 900);
    let access = token(&first, "access_token");
    let renewal = token(&first, "refresh_token");

    let res = client
        .get(srv.url("/api/auth/profile"))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let profile: Value = res.json().await.unwrap();
    assert_eq!(profile["username"], "alice");
    assert_eq!(profile["email"], "alice@example.com");
    assert_eq!(profile["role"], "user");

    let res = client
        .post(srv.url("/api/auth/refresh"))
        .bearer_auth(&access)
        .json(&json!({ "refresh_token": renewal }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let second: Value = res.json().await.unwrap();
    assert_ne!(token(&second, "refresh_token"), renewal);

    // Replaying the consumed renewal credential fails.
    let res = client
        .post(srv.url("/api/auth/refresh"))
        .bearer_auth(&access)
        .json(&json!({ "refresh_token": renewal }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(res).await, "refresh_token_invalid");

    let res = client
        .get(srv.url("/api/auth/sessions"))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();
    let sessions: Value = res.json().await.unwrap();
    assert_eq!(sessions["active_sessions"], 1);

    let res = client
        .post(srv.url("/api/auth/logout-all"))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(srv.url("/auth/refresh"))
        .json(&json!({ "refresh_token": token(&second, "refresh_token") }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(res).await, "refresh_token_invalid");

    // The access credential itself lives until it expires.
    let res = client
        .get(srv.url("/api/auth/profile"))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn public_refresh_checks_owner_only_when_a_caller_is_present() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let alice = register(&client, &srv, "alice").await;
    let bob = register(&client, &srv, "bob").await;

    let res = client
        .post(srv.url("/auth/refresh"))
        .bearer_auth(token(&bob, "access_token"))
        .json(&json!({ "refresh_token": token(&alice, "refresh_token") }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(res).await, "refresh_token_mismatch");

    // An unusable optional credential is ignored, not rejected.
    let res = client
        .post(srv.url("/auth/refresh"))
        .bearer_auth("garbage")
        .json(&json!({ "refresh_token": token(&alice, "refresh_token") }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(srv.url("/auth/refresh"))
        .json(&json!({ "refresh_token": "0000" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(res).await, "refresh_token_not_found");
}

#[tokio::test]
async fn admin_routes_are_role_gated() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let alice = register(&client, &srv, "alice").await;
    let res = client
        .post(srv.url("/api/admin/maintenance/purge"))
        .bearer_auth(token(&alice, "access_token"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(res).await, "forbidden");

    let res = login(&client, &srv, "root@example.com", "root-password").await;
    assert_eq!(res.status(), StatusCode::OK);
    let root: Value = res.json().await.unwrap();
    let root_access = token(&root, "access_token");

    // Consume alice's renewal credential so there is something to purge.
    let res = client
        .post(srv.url("/auth/refresh"))
        .json(&json!({ "refresh_token": token(&alice, "refresh_token") }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url("/api/admin/identities/2/sessions"))
        .bearer_auth(&root_access)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let overview: Value = res.json().await.unwrap();
    assert_eq!(overview["identity_id"], 2);
    assert_eq!(overview["active"], 1);
    assert_eq!(overview["credentials"].as_array().unwrap().len(), 2);
    assert!(overview["credentials"][0].get("token").is_none());

    let res = client
        .post(srv.url("/api/admin/maintenance/purge"))
        .bearer_auth(&root_access)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let report: Value = res.json().await.unwrap();
    assert_eq!(report["expired"], 0);
    assert_eq!(report["revoked"], 1);
}

#[tokio::test]
async fn validate_reports_claims_and_distinguishes_expiry() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let alice = register(&client, &srv, "alice").await;
    let access = token(&alice, "access_token");

    // Bare token, no scheme.
    let res = client
        .post(srv.url("/auth/validate"))
        .header("Authorization", &access)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["valid"], true);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], "user");

    let now = Utc::now();
    let stale = AccessClaims {
        user_id: IdentityId::new(2),
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        role: Role::USER,
        jti: "stale".to_string(),
        iat: (now - ChronoDuration::hours(1)).timestamp(),
        nbf: (now - ChronoDuration::hours(1)).timestamp(),
        exp: (now - ChronoDuration::minutes(30)).timestamp(),
        iss: "gatekeeper".to_string(),
        sub: "alice".to_string(),
    };
    let stale = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &stale,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt");

    let res = client
        .post(srv.url("/auth/validate"))
        .bearer_auth(&stale)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(res).await, "token_expired");

    let res = client
        .get(srv.url("/api/auth/validate"))
        .bearer_auth(&stale)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(res).await, "token_expired");
}

#[tokio::test]
async fn registration_and_login_failures() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register(&client, &srv, "alice").await;

    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({ "name": "alice2", "email": "alice@example.com", "password": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(error_code(res).await, "conflict");

    let res = client
        .post(srv.url("/auth/register"))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(res).await, "validation_error");

    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({ "name": "", "email": "e@example.com", "password": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = login(&client, &srv, "alice@example.com", "wrong").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(res).await, "unauthorized");

    let res = login(&client, &srv, "alice@example.com", "s3cret-pass").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn app_from_config_uses_in_memory_stores_without_database_url() {
    let config = gatekeeper_api::config::AppConfig::from_lookup(|key| match key {
        "JWT_SECRET_KEY" => Some(JWT_SECRET.to_string()),
        "JWT_ACCESS_TOKEN_DURATION" => Some("60".to_string()),
        _ => None,
    });
    let app = gatekeeper_api::app::build_app(&config).await.unwrap();
    let srv = TestServer::serve(app).await;
    let client = reqwest::Client::new();

    let body = register(&client, &srv, "carol").await;
    assert_eq!(body["expires_in"], 60);
}
