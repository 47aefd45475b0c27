//! Login and lockout behaviour against a real database.

#![allow(clippy::unwrap_used)]

use sqlx::PgPool;

use mailroom_core::{AdminRole, Email};
use mailroom_integration_tests::{TEST_PASSWORD, seed_admin, unique_email};
use mailroom_server::config::LockoutPolicy;
use mailroom_server::db::UserRepository;
use mailroom_server::services::lifecycle::CreateUserRequest;
use mailroom_server::services::{AuthError, AuthService, LifecycleService};

async fn seed_user(pool: &PgPool) -> Email {
    let admin = seed_admin(pool, AdminRole::Admin).await;
    let email = unique_email("login");
    LifecycleService::new(pool)
        .create(
            &admin,
            CreateUserRequest {
                email: email.clone(),
                first_name: "Lock".to_owned(),
                last_name: "Test".to_owned(),
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
async fn test_lockout_after_max_failures(pool: PgPool) {
    let email = seed_user(&pool).await;
    let policy = LockoutPolicy {
        max_failed_attempts: 3,
        lockout_minutes: 15,
    };
    let auth = AuthService::new(&pool, &policy);

    for _ in 0..3 {
        assert!(matches!(
            auth.login_user(email.as_str(), "wrong password").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    let user = UserRepository::new(&pool)
        .get_by_email(&email)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.failed_login_attempts, 3);
    assert!(user.locked_until.is_some());

    // Locked accounts reject even the right password.
    assert!(matches!(
        auth.login_user(email.as_str(), TEST_PASSWORD).await,
        Err(AuthError::Locked)
    ));
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_success_resets_counter(pool: PgPool) {
    let email = seed_user(&pool).await;
    let policy = LockoutPolicy::default();
    let auth = AuthService::new(&pool, &policy);

    auth.login_user(email.as_str(), "wrong password")
        .await
        .unwrap_err();
    let user = auth.login_user(email.as_str(), TEST_PASSWORD).await.unwrap();
    assert_eq!(user.email, email);

    let user = UserRepository::new(&pool)
        .get_by_email(&email)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.failed_login_attempts, 0);
    assert!(user.last_login_at.is_some());
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_suspended_user_cannot_log_in(pool: PgPool) {
    let email = seed_user(&pool).await;
    let admin = seed_admin(&pool, AdminRole::Admin).await;
    LifecycleService::new(&pool)
        .suspend(&admin, &email, Some("abuse"))
        .await
        .unwrap();

    let policy = LockoutPolicy::default();
    assert!(matches!(
        AuthService::new(&pool, &policy)
            .login_user(email.as_str(), TEST_PASSWORD)
            .await,
        Err(AuthError::Suspended)
    ));
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_unlock_clears_lockout(pool: PgPool) {
    let email = seed_user(&pool).await;
    let admin = seed_admin(&pool, AdminRole::Admin).await;
    let policy = LockoutPolicy {
        max_failed_attempts: 1,
        lockout_minutes: 60,
    };
    let auth = AuthService::new(&pool, &policy);
    auth.login_user(email.as_str(), "wrong password")
        .await
        .unwrap_err();

    let user = LifecycleService::new(&pool)
        .unlock(&admin, &email)
        .await
        .unwrap();
    assert_eq!(user.failed_login_attempts, 0);
    assert!(user.locked_until.is_none());

    auth.login_user(email.as_str(), TEST_PASSWORD).await.unwrap();
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_admin_login_and_deactivation(pool: PgPool) {
    let admin = seed_admin(&pool, AdminRole::SuperAdmin).await;
    let policy = LockoutPolicy::default();
    let auth = AuthService::new(&pool, &policy);

    let logged_in = auth
        .login_admin(admin.email.as_str(), TEST_PASSWORD)
        .await
        .unwrap();
    assert_eq!(logged_in.role, AdminRole::SuperAdmin);

    assert!(matches!(
        auth.login_admin(admin.email.as_str(), "nope nope nope").await,
        Err(AuthError::InvalidCredentials)
    ));
    assert!(matches!(
        auth.login_admin("nobody@example.org", TEST_PASSWORD).await,
        Err(AuthError::InvalidCredentials)
    ));
}
