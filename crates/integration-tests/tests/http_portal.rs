//! End-to-end tests against a running portal.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The server running (cargo run -p mailroom-server)
//! - An operator created with `mailroom-cli admin create`, whose credentials
//!   are in `PORTAL_TEST_ADMIN_EMAIL` / `PORTAL_TEST_ADMIN_PASSWORD`
//!
//! Run with: cargo test -p mailroom-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use mailroom_integration_tests::{HttpAccounts, TEST_PASSWORD, portal_base_url, unique_email};

fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// A client holding an admin session cookie.
async fn admin_client() -> Client {
    let accounts = HttpAccounts::from_env();
    let client = client();
    let resp = client
        .post(format!("{}/auth/admin-login", portal_base_url()))
        .json(&json!({
            "email": accounts.admin_email,
            "password": accounts.admin_password,
        }))
        .send()
        .await
        .expect("admin login request");
    assert_eq!(resp.status(), StatusCode::OK, "admin login failed");
    client
}

#[tokio::test]
#[ignore = "Requires running portal server"]
async fn test_health_endpoints() {
    let base = portal_base_url();
    let resp = client().get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");

    let resp = client()
        .get(format!("{base}/health/ready"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running portal server"]
async fn test_admin_routes_require_session() {
    let resp = client()
        .get(format!("{}/admin/users", portal_base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
#[ignore = "Requires running portal server"]
async fn test_request_id_is_echoed() {
    let resp = client()
        .get(format!("{}/health", portal_base_url()))
        .header("x-request-id", "it-works-42")
        .send()
        .await
        .unwrap();
    assert_eq!(
        resp.headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("it-works-42")
    );
}

#[tokio::test]
#[ignore = "Requires running portal server"]
async fn test_me_reports_admin_identity() {
    let client = admin_client().await;
    let resp = client
        .get(format!("{}/auth/me", portal_base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["kind"], "admin");
}

#[tokio::test]
#[ignore = "Requires running portal server"]
async fn test_user_lifecycle_over_http() {
    let base = portal_base_url();
    let admin = admin_client().await;
    let email = unique_email("http").to_string();

    let resp = admin
        .post(format!("{base}/admin/users"))
        .json(&json!({
            "email": email,
            "first_name": "Http",
            "last_name": "Test",
            "password": TEST_PASSWORD,
            "quota_mb": 256,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = admin
        .post(format!("{base}/admin/users"))
        .json(&json!({
            "email": email,
            "first_name": "Http",
            "last_name": "Test",
            "password": TEST_PASSWORD,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "duplicate email");

    let detail: Value = admin
        .get(format!("{base}/admin/users/{email}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["mailbox"]["quota_mb"], 256);

    // The new user can sign in and sees their own mailbox.
    let user = client();
    let resp = user
        .post(format!("{base}/auth/login"))
        .json(&json!({ "email": email, "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = user
        .get(format!("{base}/user/mailbox-info"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // End-user sessions are refused on admin routes.
    let resp = user
        .get(format!("{base}/admin/dashboard"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = admin
        .post(format!("{base}/admin/users/{email}/suspend"))
        .json(&json!({ "reason": "test" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client()
        .post(format!("{base}/auth/login"))
        .json(&json!({ "email": email, "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN, "suspended login");

    let resp = admin
        .delete(format!("{base}/admin/users/{email}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let logs: Value = admin
        .get(format!("{base}/admin/audit-logs?search={email}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let actions: Vec<&str> = logs
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["action_type"].as_str())
        .collect();
    assert_eq!(actions, ["user_deleted", "user_suspended", "user_created"]);
}
