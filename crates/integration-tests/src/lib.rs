//! Integration test helpers for the Mailroom portal.
//!
//! # Running Tests
//!
//! ```bash
//! # Pure API tests (always run)
//! cargo test -p mailroom-integration-tests
//!
//! # Database tests (needs a PostgreSQL server sqlx can create databases on)
//! DATABASE_URL=postgres://... cargo test -p mailroom-integration-tests -- --ignored
//! ```
//!
//! HTTP tests additionally expect a running server at `PORTAL_TEST_URL`
//! seeded with the accounts named in [`HttpAccounts`].

use std::net::{IpAddr, Ipv4Addr};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use mailroom_core::{AdminRole, Email};
use mailroom_server::config::{LockoutPolicy, PortalConfig};
use mailroom_server::db::AdminUserRepository;
use mailroom_server::db::admin_users::NewAdminUser;
use mailroom_server::middleware::create_session_layer;
use mailroom_server::models::Actor;
use mailroom_server::routes;
use mailroom_server::services::auth::hash_password;
use mailroom_server::state::AppState;

/// Password used for every seeded account.
pub const TEST_PASSWORD: &str = "correct horse battery";

/// Client address sent with in-process requests.
pub const TEST_CLIENT_IP: &str = "192.0.2.10";

/// Base URL of a running portal for HTTP tests.
#[must_use]
pub fn portal_base_url() -> String {
    std::env::var("PORTAL_TEST_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned())
}

/// Accounts the HTTP tests log in as.
#[derive(Debug, Clone)]
pub struct HttpAccounts {
    pub admin_email: String,
    pub admin_password: String,
}

impl HttpAccounts {
    /// Read `PORTAL_TEST_ADMIN_EMAIL` / `PORTAL_TEST_ADMIN_PASSWORD`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            admin_email: std::env::var("PORTAL_TEST_ADMIN_EMAIL")
                .unwrap_or_else(|_| "ops@example.org".to_owned()),
            admin_password: std::env::var("PORTAL_TEST_ADMIN_PASSWORD")
                .unwrap_or_else(|_| TEST_PASSWORD.to_owned()),
        }
    }
}

/// A fresh address in `example.org` that no other test uses.
///
/// # Panics
///
/// Never in practice; the generated address is always well formed.
#[must_use]
pub fn unique_email(prefix: &str) -> Email {
    let suffix = Uuid::new_v4().simple().to_string();
    let local = format!("{prefix}-{}", suffix.get(..12).unwrap_or(&suffix));
    Email::parse(&format!("{local}@example.org")).expect("generated email is valid")
}

/// Insert a console operator and return it as an acting [`Actor`].
///
/// # Panics
///
/// Panics if the insert fails.
pub async fn seed_admin(pool: &PgPool, role: AdminRole) -> Actor {
    let email = unique_email("admin");
    let admin = AdminUserRepository::new(pool)
        .create(&NewAdminUser {
            email,
            name: "Test Admin".to_owned(),
            role,
            password_hash: hash_password(TEST_PASSWORD).expect("hash test password"),
            created_by: None,
        })
        .await
        .expect("seed admin");

    Actor {
        admin_id: admin.id,
        email: admin.email,
        role: admin.role,
        ip: Some("127.0.0.1".to_owned()),
    }
}

/// Configuration for an in-process portal over plain HTTP.
#[must_use]
pub fn test_config() -> PortalConfig {
    PortalConfig {
        database_url: SecretString::from("postgres://unused"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost".to_owned(),
        session_secret: SecretString::from("integration-session-secret-0123456789abcdef"),
        lockout: LockoutPolicy::default(),
        log_json: false,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
        tls: None,
    }
}

/// The API router with sessions stored in `pool`, ready for `oneshot`.
///
/// Requests need an `x-forwarded-for` header so the login rate limiter can
/// key them without a peer address.
#[must_use]
pub fn portal_app(pool: PgPool) -> Router {
    let config = test_config();
    let session_layer = create_session_layer(&pool, &config);
    routes::routes()
        .layer(session_layer)
        .with_state(AppState::new(config, pool))
}

/// Log in through `path` and return the `name=value` part of the session
/// cookie.
///
/// # Panics
///
/// Panics if the login is refused or sets no cookie.
pub async fn login_cookie(app: &Router, path: &str, email: &Email) -> String {
    let body = json!({ "email": email, "password": TEST_PASSWORD }).to_string();
    let response = app
        .clone()
        .oneshot(
            Request::post(path)
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-forwarded-for", TEST_CLIENT_IP)
                .body(Body::from(body))
                .expect("login request"),
        )
        .await
        .expect("router is infallible");
    assert_eq!(response.status(), StatusCode::OK, "login via {path}");

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("login sets the session cookie");
    cookie.split(';').next().unwrap_or(cookie).to_owned()
}

/// Send a request carrying `cookie` and an optional JSON body; return the
/// status.
///
/// # Panics
///
/// Panics if the request cannot be built.
pub async fn send_with_cookie(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: &str,
    body: Option<serde_json::Value>,
) -> StatusCode {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header("x-forwarded-for", TEST_CLIENT_IP);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    app.clone()
        .oneshot(request)
        .await
        .expect("router is infallible")
        .status()
}
