//! Mailbox metadata repository.

use sqlx::PgPool;

use mailroom_core::{DEFAULT_QUOTA_BYTES, Email};

use super::RepositoryError;
use crate::models::MailboxMetadata;

/// Repository for per-address quota and usage.
pub struct MailboxRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MailboxRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Read the metadata row, creating the default one (5 GiB quota, no
    /// usage) if the address has none yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_or_create(&self, email: &Email) -> Result<MailboxMetadata, RepositoryError> {
        sqlx::query(
            "INSERT INTO portal.mailbox_metadata (email, quota_bytes, used_bytes)
             VALUES ($1, $2, 0)
             ON CONFLICT (email) DO NOTHING",
        )
        .bind(email)
        .bind(DEFAULT_QUOTA_BYTES)
        .execute(self.pool)
        .await?;

        let metadata = sqlx::query_as::<_, MailboxMetadata>(
            "SELECT email, quota_bytes, used_bytes, updated_at
             FROM portal.mailbox_metadata
             WHERE email = $1",
        )
        .bind(email)
        .fetch_one(self.pool)
        .await?;
        Ok(metadata)
    }

    /// Set the quota, creating the row if needed. Usage is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_quota(
        &self,
        email: &Email,
        quota_bytes: i64,
    ) -> Result<MailboxMetadata, RepositoryError> {
        let metadata = sqlx::query_as::<_, MailboxMetadata>(
            "INSERT INTO portal.mailbox_metadata (email, quota_bytes, used_bytes)
             VALUES ($1, $2, 0)
             ON CONFLICT (email) DO UPDATE SET
                quota_bytes = EXCLUDED.quota_bytes,
                updated_at = NOW()
             RETURNING email, quota_bytes, used_bytes, updated_at",
        )
        .bind(email)
        .bind(quota_bytes)
        .fetch_one(self.pool)
        .await?;
        Ok(metadata)
    }

    /// Set the quota for every listed address that belongs to an existing
    /// user. Returns the number of mailboxes touched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn bulk_upsert_quota(
        &self,
        emails: &[String],
        quota_bytes: i64,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO portal.mailbox_metadata (email, quota_bytes, used_bytes)
             SELECT email, $2, 0 FROM portal.app_user WHERE email = ANY($1)
             ON CONFLICT (email) DO UPDATE SET
                quota_bytes = EXCLUDED.quota_bytes,
                updated_at = NOW()",
        )
        .bind(emails)
        .bind(quota_bytes)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
