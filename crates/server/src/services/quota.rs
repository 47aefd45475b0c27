//! Quota and mailbox metadata manager.

use serde_json::json;
use sqlx::PgPool;
use tracing::{info, instrument};

use mailroom_core::{AuditAction, Email, MailboxUsage, mb_to_bytes};

use crate::db::{MailboxRepository, UserRepository};
use crate::error::AppError;
use crate::models::Actor;
use crate::services::audit::AuditRecorder;

pub struct QuotaService<'a> {
    users: UserRepository<'a>,
    mailboxes: MailboxRepository<'a>,
    audit: AuditRecorder<'a>,
}

impl<'a> QuotaService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
            mailboxes: MailboxRepository::new(pool),
            audit: AuditRecorder::new(pool),
        }
    }

    /// Quota and usage for an address. The first read creates the default
    /// row.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a query fails.
    pub async fn get_usage(&self, email: &Email) -> Result<MailboxUsage, AppError> {
        Ok(self.mailboxes.get_or_create(email).await?.usage())
    }

    /// Set a user's quota in megabytes.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a negative or oversized quota.
    /// Returns `AppError::NotFound` if the user does not exist.
    #[instrument(skip(self, actor), fields(admin = %actor.email, target_email = %email))]
    pub async fn set_quota(
        &self,
        actor: &Actor,
        email: &Email,
        quota_mb: i64,
    ) -> Result<MailboxUsage, AppError> {
        let quota_bytes = mb_to_bytes(quota_mb)?;

        if self.users.get_by_email(email).await?.is_none() {
            return Err(AppError::NotFound("User".to_owned()));
        }

        let metadata = self.mailboxes.upsert_quota(email, quota_bytes).await?;

        info!(quota_mb, "Quota updated");
        self.audit
            .record(
                actor,
                AuditAction::QuotaUpdated,
                Some(email.as_str()),
                Some(json!({ "quota_mb": quota_mb })),
            )
            .await?;
        Ok(metadata.usage())
    }
}
