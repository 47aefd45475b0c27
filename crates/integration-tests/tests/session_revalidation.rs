//! Sessions only name an account: every request reloads it, so admin actions
//! taken after login apply to live sessions at once.
//!
//! Runs the router in process with sessions in the test database.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::http::StatusCode;
use sqlx::PgPool;

use mailroom_core::{AdminRole, Email};
use mailroom_integration_tests::{
    TEST_PASSWORD, login_cookie, portal_app, seed_admin, send_with_cookie, unique_email,
};
use mailroom_server::db::AdminUserRepository;
use mailroom_server::db::admin_users::AdminUserUpdate;
use mailroom_server::services::LifecycleService;
use mailroom_server::services::lifecycle::CreateUserRequest;

async fn send(app: &Router, method: &str, uri: &str, cookie: &str) -> StatusCode {
    send_with_cookie(app, method, uri, cookie, None).await
}

async fn create_user(pool: &PgPool, prefix: &str) -> Email {
    let admin = seed_admin(pool, AdminRole::Admin).await;
    let email = unique_email(prefix);
    LifecycleService::new(pool)
        .create(
            &admin,
            CreateUserRequest {
                email: email.clone(),
                first_name: "Jane".to_owned(),
                last_name: "Doe".to_owned(),
                password: TEST_PASSWORD.to_owned(),
                quota_mb: None,
            },
        )
        .await
        .unwrap();
    email
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_suspension_applies_to_live_user_session(pool: PgPool) {
    let app = portal_app(pool.clone());
    let email = create_user(&pool, "live").await;
    let cookie = login_cookie(&app, "/auth/login", &email).await;
    assert_eq!(send(&app, "GET", "/user/profile", &cookie).await, StatusCode::OK);

    let admin = seed_admin(&pool, AdminRole::Admin).await;
    let service = LifecycleService::new(&pool);
    service.suspend(&admin, &email, Some("abuse")).await.unwrap();
    assert_eq!(
        send(&app, "GET", "/user/profile", &cookie).await,
        StatusCode::FORBIDDEN
    );

    service.unsuspend(&admin, &email).await.unwrap();
    assert_eq!(send(&app, "GET", "/user/profile", &cookie).await, StatusCode::OK);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_deleted_user_session_is_dropped_without_recreating_rows(pool: PgPool) {
    let app = portal_app(pool.clone());
    let email = create_user(&pool, "gone").await;
    let cookie = login_cookie(&app, "/auth/login", &email).await;

    let admin = seed_admin(&pool, AdminRole::Admin).await;
    LifecycleService::new(&pool)
        .delete(&admin, &email)
        .await
        .unwrap();

    assert_eq!(
        send(&app, "GET", "/user/mailbox-info", &cookie).await,
        StatusCode::UNAUTHORIZED
    );
    let (mailboxes,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM portal.mailbox_metadata WHERE email = $1")
            .bind(&email)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(mailboxes, 0);

    // The stale session was flushed.
    assert_eq!(
        send(&app, "GET", "/auth/me", &cookie).await,
        StatusCode::UNAUTHORIZED
    );
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_deactivated_admin_loses_console_access(pool: PgPool) {
    let app = portal_app(pool.clone());
    let admin = seed_admin(&pool, AdminRole::Admin).await;
    let cookie = login_cookie(&app, "/auth/admin-login", &admin.email).await;
    assert_eq!(send(&app, "GET", "/admin/users", &cookie).await, StatusCode::OK);

    AdminUserRepository::new(&pool)
        .update(
            admin.admin_id,
            AdminUserUpdate {
                is_active: Some(false),
                ..AdminUserUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(
        send(&app, "GET", "/admin/users", &cookie).await,
        StatusCode::FORBIDDEN
    );
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_deleted_admin_loses_console_access(pool: PgPool) {
    let app = portal_app(pool.clone());
    let admin = seed_admin(&pool, AdminRole::Admin).await;
    let cookie = login_cookie(&app, "/auth/admin-login", &admin.email).await;

    AdminUserRepository::new(&pool)
        .delete(admin.admin_id)
        .await
        .unwrap();
    assert_eq!(
        send(&app, "GET", "/admin/users", &cookie).await,
        StatusCode::FORBIDDEN
    );
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_demoted_super_admin_loses_super_admin_routes(pool: PgPool) {
    let app = portal_app(pool.clone());
    let super_admin = seed_admin(&pool, AdminRole::SuperAdmin).await;
    let other = seed_admin(&pool, AdminRole::Admin).await;
    let cookie = login_cookie(&app, "/auth/admin-login", &super_admin.email).await;

    AdminUserRepository::new(&pool)
        .update(
            super_admin.admin_id,
            AdminUserUpdate {
                role: Some(AdminRole::Admin),
                ..AdminUserUpdate::default()
            },
        )
        .await
        .unwrap();

    let uri = format!("/admin/admin-users/{}", other.admin_id);
    assert_eq!(send(&app, "DELETE", &uri, &cookie).await, StatusCode::FORBIDDEN);
    assert!(
        AdminUserRepository::new(&pool)
            .get_by_id(other.admin_id)
            .await
            .unwrap()
            .is_some()
    );
}
