//! Domain primacy and scheduled-action status rules against a real database.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use axum::http::StatusCode;
use chrono::{TimeDelta, Utc};
use serde_json::json;
use sqlx::PgPool;

use mailroom_core::{AdminRole, ScheduledActionStatus};
use mailroom_integration_tests::{
    login_cookie, portal_app, seed_admin, send_with_cookie, unique_email,
};
use mailroom_server::db::domains::NewDomain;
use mailroom_server::db::scheduled_actions::NewScheduledAction;
use mailroom_server::db::{DomainRepository, ScheduledActionRepository};
use mailroom_server::models::ScheduledAction;

fn new_domain(name: &str) -> NewDomain {
    NewDomain {
        name: name.to_owned(),
        description: None,
        is_active: true,
    }
}

async fn schedule(pool: &PgPool) -> ScheduledAction {
    ScheduledActionRepository::new(pool)
        .create(&NewScheduledAction {
            action_type: "suspend".to_owned(),
            target_email: unique_email("later"),
            payload: None,
            scheduled_for: Utc::now() + TimeDelta::days(1),
            created_by: "ops@example.org".to_owned(),
        })
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_only_first_domain_is_primary(pool: PgPool) {
    let domains = DomainRepository::new(&pool);

    let first = domains.create(&new_domain("example.org")).await.unwrap();
    let second = domains.create(&new_domain("example.net")).await.unwrap();
    assert!(first.is_primary);
    assert!(!second.is_primary);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_racing_first_domain_falls_back_to_non_primary(pool: PgPool) {
    // Hold an uncommitted first domain so the concurrent insert also sees an
    // empty table and then waits on the single-primary index.
    let mut tx = pool.begin().await.unwrap();
    sqlx::query("INSERT INTO portal.mail_domain (name, is_primary) VALUES ('example.org', TRUE)")
        .execute(&mut *tx)
        .await
        .unwrap();

    let racer = {
        let pool = pool.clone();
        tokio::spawn(async move {
            DomainRepository::new(&pool)
                .create(&new_domain("example.net"))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(300)).await;
    tx.commit().await.unwrap();

    let domain = racer.await.unwrap().unwrap();
    assert_eq!(domain.name, "example.net");
    assert!(!domain.is_primary);
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_non_pending_actions_are_frozen(pool: PgPool) {
    let app = portal_app(pool.clone());
    let admin = seed_admin(&pool, AdminRole::Admin).await;
    let cookie = login_cookie(&app, "/auth/admin-login", &admin.email).await;

    let executed = schedule(&pool).await;
    sqlx::query(
        "UPDATE portal.scheduled_action SET status = 'executed', executed_at = NOW() WHERE id = $1",
    )
    .bind(executed.id)
    .execute(&pool)
    .await
    .unwrap();

    let uri = format!("/admin/scheduled-actions/{}", executed.id);
    let edit = json!({ "action_type": "unsuspend" });
    assert_eq!(
        send_with_cookie(&app, "PUT", &uri, &cookie, Some(edit)).await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        send_with_cookie(&app, "DELETE", &uri, &cookie, None).await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        send_with_cookie(&app, "POST", &format!("{uri}/cancel"), &cookie, None).await,
        StatusCode::BAD_REQUEST
    );

    let unchanged = ScheduledActionRepository::new(&pool)
        .get(executed.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.status, ScheduledActionStatus::Executed);
    assert_eq!(unchanged.action_type, "suspend");
}

#[sqlx::test(migrations = "../server/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_cancel_is_one_way(pool: PgPool) {
    let app = portal_app(pool.clone());
    let admin = seed_admin(&pool, AdminRole::Admin).await;
    let cookie = login_cookie(&app, "/auth/admin-login", &admin.email).await;

    let pending = schedule(&pool).await;
    let cancel = format!("/admin/scheduled-actions/{}/cancel", pending.id);
    assert_eq!(
        send_with_cookie(&app, "POST", &cancel, &cookie, None).await,
        StatusCode::OK
    );
    assert_eq!(
        send_with_cookie(&app, "POST", &cancel, &cookie, None).await,
        StatusCode::BAD_REQUEST
    );

    let actions = ScheduledActionRepository::new(&pool);
    assert_eq!(
        actions.get(pending.id).await.unwrap().unwrap().status,
        ScheduledActionStatus::Cancelled
    );

    // The repository guard also refuses a stale `from`.
    let stale = actions
        .set_status(
            pending.id,
            ScheduledActionStatus::Pending,
            ScheduledActionStatus::Executed,
        )
        .await;
    assert!(stale.is_err());
}
