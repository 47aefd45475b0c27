//! Account lifecycle against a real database.
//!
//! Needs a `PostgreSQL` server reachable through `DATABASE_URL`; each test
//! gets its own database with the server migrations applied.

#![allow(clippy::unwrap_used)]

use sqlx::PgPool;

use mailroom_core::{AdminRole, BulkAction, DEFAULT_QUOTA_BYTES, Email};
use mailroom_integration_tests::{TEST_PASSWORD, seed_admin, unique_email};
use mailroom_server::db::{AuditLogRepository, MailboxRepository, UserRepository};
use mailroom_server::error::AppError;
use mailroom_server::services::{LifecycleService, QuotaService};
use mailroom_server::services::lifecycle::{BulkData, BulkRequest, CreateUserRequest};

async fn audit_rows(pool: &PgPool) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM portal.audit_log")
        .fetch_one(pool)
        .await
        .unwrap();
    count
}

fn create_request(email: &Email, quota_mb: Option<i64>) -> CreateUserRequest {
    CreateUserRequest {
        email: email.clone(),
        first_name: "Jane".to_owned(),
        last_name: "Doe".to_owned(),
        password: TEST_PASSWORD.to_owned(),
        quota_mb,
    }
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_create_provisions_mailbox_and_audits(pool: PgPool) {
    let admin = seed_admin(&pool, AdminRole::Admin).await;
    let email = unique_email("jane");

    let user = LifecycleService::new(&pool)
        .create(&admin, create_request(&email, None))
        .await
        .unwrap();
    assert_eq!(user.email, email);
    assert!(!user.is_suspended);

    let mailbox = MailboxRepository::new(&pool)
        .get_or_create(&email)
        .await
        .unwrap();
    assert_eq!(mailbox.usage().quota_bytes, DEFAULT_QUOTA_BYTES);

    let entries = AuditLogRepository::new(&pool)
        .list(Some(email.as_str()), 10)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    let entry = entries.first().unwrap();
    assert_eq!(entry.action_type, "user_created");
    assert_eq!(entry.admin_email, admin.email.as_str());
    assert_eq!(entry.ip_address.as_deref(), Some("127.0.0.1"));
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_duplicate_email_is_a_validation_error(pool: PgPool) {
    let admin = seed_admin(&pool, AdminRole::Admin).await;
    let email = unique_email("dup");
    let service = LifecycleService::new(&pool);

    service
        .create(&admin, create_request(&email, Some(512)))
        .await
        .unwrap();
    let err = service
        .create(&admin, create_request(&email, Some(512)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_suspend_then_unsuspend(pool: PgPool) {
    let admin = seed_admin(&pool, AdminRole::Admin).await;
    let email = unique_email("susp");
    let service = LifecycleService::new(&pool);
    service.create(&admin, create_request(&email, None)).await.unwrap();

    let user = service
        .suspend(&admin, &email, Some("billing"))
        .await
        .unwrap();
    assert!(user.is_suspended);
    assert_eq!(user.suspended_reason.as_deref(), Some("billing"));

    let user = service.unsuspend(&admin, &email).await.unwrap();
    assert!(!user.is_suspended);
    assert!(user.suspended_reason.is_none());
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_missing_user_is_not_found(pool: PgPool) {
    let admin = seed_admin(&pool, AdminRole::Admin).await;
    let ghost = unique_email("ghost");
    let service = LifecycleService::new(&pool);

    assert!(matches!(
        service.get(&ghost).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        service.suspend(&admin, &ghost, None).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        service.delete(&admin, &ghost).await,
        Err(AppError::NotFound(_))
    ));
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_generated_password_reset_is_returned_once(pool: PgPool) {
    let admin = seed_admin(&pool, AdminRole::Admin).await;
    let email = unique_email("reset");
    let service = LifecycleService::new(&pool);
    service.create(&admin, create_request(&email, None)).await.unwrap();

    let reset = service.reset_password(&admin, &email, None).await.unwrap();
    let temporary = reset.temporary_password.unwrap();
    assert!(temporary.len() >= 8);

    let reset = service
        .reset_password(&admin, &email, Some("another long password".to_owned()))
        .await
        .unwrap();
    assert!(reset.temporary_password.is_none());
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_bulk_suspend_reports_affected_count(pool: PgPool) {
    let admin = seed_admin(&pool, AdminRole::Admin).await;
    let service = LifecycleService::new(&pool);
    let first = unique_email("bulk");
    let second = unique_email("bulk");
    for email in [&first, &second] {
        service.create(&admin, create_request(email, None)).await.unwrap();
    }

    let outcome = service
        .bulk_apply(
            &admin,
            BulkRequest {
                action: "suspend".to_owned(),
                emails: vec![
                    first.to_string(),
                    second.to_string(),
                    unique_email("absent").to_string(),
                ],
                data: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.action, BulkAction::Suspend);
    assert_eq!(outcome.affected_count, 2);

    let users = UserRepository::new(&pool);
    assert!(users.get_by_email(&first).await.unwrap().unwrap().is_suspended);
    assert!(users.get_by_email(&second).await.unwrap().unwrap().is_suspended);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_bulk_quota_requires_data(pool: PgPool) {
    let admin = seed_admin(&pool, AdminRole::Admin).await;
    let service = LifecycleService::new(&pool);
    let email = unique_email("quota");
    service.create(&admin, create_request(&email, None)).await.unwrap();

    let missing = service
        .bulk_apply(
            &admin,
            BulkRequest {
                action: "update_quota".to_owned(),
                emails: vec![email.to_string()],
                data: None,
            },
        )
        .await;
    assert!(matches!(missing, Err(AppError::Validation(_))));

    let outcome = service
        .bulk_apply(
            &admin,
            BulkRequest {
                action: "update_quota".to_owned(),
                emails: vec![email.to_string()],
                data: Some(BulkData {
                    quota_mb: Some(2048),
                    group_id: None,
                }),
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.affected_count, 1);

    let detail = service.get(&email).await.unwrap();
    assert_eq!(detail.mailbox.quota_mb, 2048);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_set_quota_round_trips_megabytes(pool: PgPool) {
    let admin = seed_admin(&pool, AdminRole::Admin).await;
    let email = unique_email("quota");
    LifecycleService::new(&pool)
        .create(&admin, create_request(&email, None))
        .await
        .unwrap();

    let quotas = QuotaService::new(&pool);
    let set = quotas.set_quota(&admin, &email, 5000).await.unwrap();
    assert_eq!(set.quota_mb, 5000);

    let usage = quotas.get_usage(&email).await.unwrap();
    assert_eq!(usage.quota_mb, 5000);
    assert_eq!(usage.quota_bytes, 5000 * 1024 * 1024);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_each_mutation_writes_one_audit_row(pool: PgPool) {
    let admin = seed_admin(&pool, AdminRole::Admin).await;
    let email = unique_email("audited");
    let service = LifecycleService::new(&pool);
    service.create(&admin, create_request(&email, None)).await.unwrap();
    let before = audit_rows(&pool).await;

    // Idempotent repeats are still audited once each.
    service.suspend(&admin, &email, None).await.unwrap();
    service.suspend(&admin, &email, None).await.unwrap();
    assert_eq!(audit_rows(&pool).await, before + 2);

    service.unsuspend(&admin, &email).await.unwrap();
    service.unlock(&admin, &email).await.unwrap();
    service.reset_password(&admin, &email, None).await.unwrap();
    QuotaService::new(&pool)
        .set_quota(&admin, &email, 100)
        .await
        .unwrap();
    assert_eq!(audit_rows(&pool).await, before + 6);

    let actions: Vec<String> = AuditLogRepository::new(&pool)
        .list(Some(email.as_str()), 10)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.action_type)
        .collect();
    assert_eq!(actions.first().map(String::as_str), Some("quota_updated"));
    assert_eq!(actions.len(), 7);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_bulk_writes_one_summary_audit_row(pool: PgPool) {
    let admin = seed_admin(&pool, AdminRole::Admin).await;
    let service = LifecycleService::new(&pool);
    let emails = [unique_email("sum"), unique_email("sum"), unique_email("sum")];
    for email in &emails {
        service.create(&admin, create_request(email, None)).await.unwrap();
    }
    let before = audit_rows(&pool).await;

    let outcome = service
        .bulk_apply(
            &admin,
            BulkRequest {
                action: "suspend".to_owned(),
                emails: emails.iter().map(ToString::to_string).collect(),
                data: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.affected_count, 3);
    assert_eq!(audit_rows(&pool).await, before + 1);

    let (details,): (serde_json::Value,) = sqlx::query_as(
        "SELECT details FROM portal.audit_log ORDER BY created_at DESC, id DESC LIMIT 1",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(details["affected_count"], 3);
    assert_eq!(details["emails"].as_array().unwrap().len(), 3);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_bulk_with_no_emails_changes_nothing(pool: PgPool) {
    let admin = seed_admin(&pool, AdminRole::Admin).await;
    let email = unique_email("untouched");
    let service = LifecycleService::new(&pool);
    service.create(&admin, create_request(&email, None)).await.unwrap();
    let before = audit_rows(&pool).await;

    let result = service
        .bulk_apply(
            &admin,
            BulkRequest {
                action: "suspend".to_owned(),
                emails: Vec::new(),
                data: None,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    assert_eq!(audit_rows(&pool).await, before);
    let user = UserRepository::new(&pool)
        .get_by_email(&email)
        .await
        .unwrap()
        .unwrap();
    assert!(!user.is_suspended);
}
