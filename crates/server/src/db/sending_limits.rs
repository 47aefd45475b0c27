//! Sending-limit ledger repository.
//!
//! Ledger rows are always returned joined with the owning user's email, so
//! every mutating statement is wrapped in a CTE that re-joins `app_user`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use mailroom_core::{Patch, SendingLimitId, UserId, ViolationId, ViolationType};

use super::RepositoryError;
use crate::models::{SendingLimit, Violation};

/// Default daily cap when none is given on creation.
pub const DEFAULT_DAILY_LIMIT: i32 = 100;
/// Default hourly cap when none is given on creation.
pub const DEFAULT_HOURLY_LIMIT: i32 = 50;

/// Most recent violations returned by the listing.
pub const VIOLATION_LIST_LIMIT: i64 = 500;

const LIMIT_SELECT: &str = "SELECT l.id, l.user_id, u.email, l.tier_name, l.daily_limit, \
     l.hourly_limit, l.emails_sent_today, l.emails_sent_this_hour, l.last_reset_date, \
     l.last_reset_hour, l.is_sending_enabled, l.custom_limit_reason, l.created_at, l.updated_at";

const VIOLATION_SELECT: &str = "SELECT v.id, v.user_id, u.email, v.violation_type, \
     v.attempted_count, v.limit_at_time, v.details, v.action_taken, v.is_resolved, \
     v.resolved_by, v.resolved_at, v.created_at";

/// Fields for a new ledger row.
#[derive(Debug, Clone)]
pub struct NewSendingLimit {
    pub user_id: UserId,
    pub tier_name: String,
    pub daily_limit: i32,
    pub hourly_limit: i32,
}

/// Partial update of a ledger row; only present fields are written.
#[derive(Debug, Clone, Default)]
pub struct SendingLimitUpdate {
    pub tier_name: Option<String>,
    pub daily_limit: Option<i32>,
    pub hourly_limit: Option<i32>,
    pub is_sending_enabled: Option<bool>,
    pub custom_limit_reason: Patch<String>,
}

/// A violation reported by the mail transport.
#[derive(Debug, Clone)]
pub struct NewViolation {
    pub user_id: UserId,
    pub violation_type: ViolationType,
    pub attempted_count: i32,
    pub limit_at_time: i32,
    pub details: Option<serde_json::Value>,
    pub action_taken: Option<String>,
}

/// Repository for the sending-limit ledger.
pub struct SendingLimitRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SendingLimitRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All ledger rows, ordered by user email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<SendingLimit>, RepositoryError> {
        let sql = format!(
            "{LIMIT_SELECT}
             FROM portal.email_sending_limit l
             JOIN portal.app_user u ON u.id = l.user_id
             ORDER BY u.email"
        );
        let limits = sqlx::query_as::<_, SendingLimit>(&sql)
            .fetch_all(self.pool)
            .await?;
        Ok(limits)
    }

    /// One ledger row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: SendingLimitId) -> Result<Option<SendingLimit>, RepositoryError> {
        let sql = format!(
            "{LIMIT_SELECT}
             FROM portal.email_sending_limit l
             JOIN portal.app_user u ON u.id = l.user_id
             WHERE l.id = $1"
        );
        let limit = sqlx::query_as::<_, SendingLimit>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(limit)
    }

    /// The ledger row belonging to a user, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<SendingLimit>, RepositoryError> {
        let sql = format!(
            "{LIMIT_SELECT}
             FROM portal.email_sending_limit l
             JOIN portal.app_user u ON u.id = l.user_id
             WHERE l.user_id = $1"
        );
        let limit = sqlx::query_as::<_, SendingLimit>(&sql)
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(limit)
    }

    /// Create a ledger row with zeroed counters and both reset stamps at now.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Conflict` if the user already has a row.
    pub async fn create(&self, new: &NewSendingLimit) -> Result<SendingLimit, RepositoryError> {
        let sql = format!(
            "WITH l AS (
                INSERT INTO portal.email_sending_limit
                    (user_id, tier_name, daily_limit, hourly_limit,
                     emails_sent_today, emails_sent_this_hour,
                     last_reset_date, last_reset_hour)
                VALUES ($1, $2, $3, $4, 0, 0, NOW(), NOW())
                RETURNING *
             )
             {LIMIT_SELECT}
             FROM l JOIN portal.app_user u ON u.id = l.user_id"
        );
        sqlx::query_as::<_, SendingLimit>(&sql)
            .bind(new.user_id)
            .bind(&new.tier_name)
            .bind(new.daily_limit)
            .bind(new.hourly_limit)
            .fetch_one(self.pool)
            .await
            .map_err(RepositoryError::unique_or_missing(
                "this user already has a sending limit",
            ))
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the row does not exist.
    pub async fn update(
        &self,
        id: SendingLimitId,
        update: SendingLimitUpdate,
    ) -> Result<SendingLimit, RepositoryError> {
        let (set_reason, reason) = update.custom_limit_reason.into_update();
        let sql = format!(
            "WITH l AS (
                UPDATE portal.email_sending_limit SET
                    tier_name = COALESCE($2, tier_name),
                    daily_limit = COALESCE($3, daily_limit),
                    hourly_limit = COALESCE($4, hourly_limit),
                    is_sending_enabled = COALESCE($5, is_sending_enabled),
                    custom_limit_reason = CASE WHEN $6 THEN $7 ELSE custom_limit_reason END,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
             )
             {LIMIT_SELECT}
             FROM l JOIN portal.app_user u ON u.id = l.user_id"
        );
        sqlx::query_as::<_, SendingLimit>(&sql)
            .bind(id)
            .bind(update.tier_name)
            .bind(update.daily_limit)
            .bind(update.hourly_limit)
            .bind(update.is_sending_enabled)
            .bind(set_reason)
            .bind(reason)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Re-enable sending, clear the reason and zero both counters.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the row does not exist.
    pub async fn unblock(&self, id: SendingLimitId) -> Result<SendingLimit, RepositoryError> {
        let sql = format!(
            "WITH l AS (
                UPDATE portal.email_sending_limit SET
                    is_sending_enabled = TRUE,
                    custom_limit_reason = NULL,
                    emails_sent_today = 0,
                    emails_sent_this_hour = 0,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
             )
             {LIMIT_SELECT}
             FROM l JOIN portal.app_user u ON u.id = l.user_id"
        );
        sqlx::query_as::<_, SendingLimit>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a ledger row, returning the row as it was.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the row does not exist.
    pub async fn delete(&self, id: SendingLimitId) -> Result<SendingLimit, RepositoryError> {
        let sql = format!(
            "WITH l AS (
                DELETE FROM portal.email_sending_limit WHERE id = $1 RETURNING *
             )
             {LIMIT_SELECT}
             FROM l JOIN portal.app_user u ON u.id = l.user_id"
        );
        sqlx::query_as::<_, SendingLimit>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    // =========================================================================
    // Violations
    // =========================================================================

    /// Most recent violations, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_violations(&self, limit: i64) -> Result<Vec<Violation>, RepositoryError> {
        let sql = format!(
            "{VIOLATION_SELECT}
             FROM portal.sending_limit_violation v
             JOIN portal.app_user u ON u.id = v.user_id
             ORDER BY v.created_at DESC, v.id DESC
             LIMIT $1"
        );
        let violations = sqlx::query_as::<_, Violation>(&sql)
            .bind(limit)
            .fetch_all(self.pool)
            .await?;
        Ok(violations)
    }

    /// Number of violations recorded at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_violations_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM portal.sending_limit_violation WHERE created_at >= $1",
        )
        .bind(since)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Append a violation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn record_violation(&self, new: &NewViolation) -> Result<Violation, RepositoryError> {
        let sql = format!(
            "WITH v AS (
                INSERT INTO portal.sending_limit_violation
                    (user_id, violation_type, attempted_count, limit_at_time, details, action_taken)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
             )
             {VIOLATION_SELECT}
             FROM v JOIN portal.app_user u ON u.id = v.user_id"
        );
        sqlx::query_as::<_, Violation>(&sql)
            .bind(new.user_id)
            .bind(new.violation_type)
            .bind(new.attempted_count)
            .bind(new.limit_at_time)
            .bind(&new.details)
            .bind(&new.action_taken)
            .fetch_one(self.pool)
            .await
            .map_err(RepositoryError::missing)
    }

    /// Mark a violation resolved by `resolver`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the violation does not exist.
    pub async fn resolve_violation(
        &self,
        id: ViolationId,
        resolver: &str,
    ) -> Result<Violation, RepositoryError> {
        let sql = format!(
            "WITH v AS (
                UPDATE portal.sending_limit_violation SET
                    is_resolved = TRUE,
                    resolved_by = $2,
                    resolved_at = NOW()
                WHERE id = $1
                RETURNING *
             )
             {VIOLATION_SELECT}
             FROM v JOIN portal.app_user u ON u.id = v.user_id"
        );
        sqlx::query_as::<_, Violation>(&sql)
            .bind(id)
            .bind(resolver)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }
}
