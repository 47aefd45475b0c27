//! Audit log repository. Append and list only.

use sqlx::PgPool;

use super::{RepositoryError, like_pattern};
use crate::models::AuditEntry;

/// Most recent entries returned by the listing.
pub const AUDIT_LIST_LIMIT: i64 = 500;

/// One entry to append.
#[derive(Debug, Clone)]
pub struct NewAuditEntry<'a> {
    pub action_type: &'a str,
    pub admin_email: &'a str,
    pub target_email: Option<&'a str>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
}

pub struct AuditLogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AuditLogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append one entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(&self, entry: &NewAuditEntry<'_>) -> Result<AuditEntry, RepositoryError> {
        let row = sqlx::query_as::<_, AuditEntry>(
            "INSERT INTO portal.audit_log
                (action_type, admin_email, target_email, details, ip_address)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, action_type, admin_email, target_email, details, ip_address, created_at",
        )
        .bind(entry.action_type)
        .bind(entry.admin_email)
        .bind(entry.target_email)
        .bind(&entry.details)
        .bind(&entry.ip_address)
        .fetch_one(self.pool)
        .await?;
        Ok(row)
    }

    /// Most recent entries, newest first, optionally filtered by a
    /// case-insensitive search over admin email, action type and target.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        search: Option<&str>,
        limit: i64,
    ) -> Result<Vec<AuditEntry>, RepositoryError> {
        let pattern = search.filter(|s| !s.trim().is_empty()).map(like_pattern);
        let rows = sqlx::query_as::<_, AuditEntry>(
            "SELECT id, action_type, admin_email, target_email, details, ip_address, created_at
             FROM portal.audit_log
             WHERE $1::text IS NULL
                OR admin_email ILIKE $1
                OR action_type ILIKE $1
                OR target_email ILIKE $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2",
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
