//! Scheduled action repository.
//!
//! Rows may only change while pending. Every mutating statement is guarded on
//! the pending status so a concurrent cancel cannot be overwritten. When the
//! guard rejects a row that exists, the caller gets `Conflict` explaining
//! which transition was refused.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use mailroom_core::{Email, Patch, ScheduledActionId, ScheduledActionStatus};

use super::RepositoryError;
use crate::models::ScheduledAction;

const ACTION_COLUMNS: &str = "id, action_type, target_email, payload, scheduled_for, status, \
     created_by, executed_at, created_at, updated_at";

const NOT_PENDING: &str = "only pending scheduled actions can be modified";
const CHANGED_CONCURRENTLY: &str = "scheduled action changed concurrently, reload and retry";

#[derive(Debug, Clone)]
pub struct NewScheduledAction {
    pub action_type: String,
    pub target_email: Email,
    pub payload: Option<serde_json::Value>,
    pub scheduled_for: DateTime<Utc>,
    pub created_by: String,
}

#[derive(Debug, Clone, Default)]
pub struct ScheduledActionUpdate {
    pub action_type: Option<String>,
    pub target_email: Option<Email>,
    pub payload: Patch<serde_json::Value>,
    pub scheduled_for: Option<DateTime<Utc>>,
}

pub struct ScheduledActionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ScheduledActionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All scheduled actions, soonest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<ScheduledAction>, RepositoryError> {
        let sql = format!(
            "SELECT {ACTION_COLUMNS} FROM portal.scheduled_action ORDER BY scheduled_for, id"
        );
        Ok(sqlx::query_as::<_, ScheduledAction>(&sql)
            .fetch_all(self.pool)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        id: ScheduledActionId,
    ) -> Result<Option<ScheduledAction>, RepositoryError> {
        let sql = format!("SELECT {ACTION_COLUMNS} FROM portal.scheduled_action WHERE id = $1");
        Ok(sqlx::query_as::<_, ScheduledAction>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Create a pending action.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        new: &NewScheduledAction,
    ) -> Result<ScheduledAction, RepositoryError> {
        let sql = format!(
            "INSERT INTO portal.scheduled_action
                (action_type, target_email, payload, scheduled_for, created_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {ACTION_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, ScheduledAction>(&sql)
            .bind(&new.action_type)
            .bind(&new.target_email)
            .bind(&new.payload)
            .bind(new.scheduled_for)
            .bind(&new.created_by)
            .fetch_one(self.pool)
            .await?)
    }

    /// Apply a partial update to a pending action.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the action does not exist.
    /// Returns `RepositoryError::Conflict` if it is no longer pending.
    pub async fn update(
        &self,
        id: ScheduledActionId,
        update: ScheduledActionUpdate,
    ) -> Result<ScheduledAction, RepositoryError> {
        let (set_payload, payload) = update.payload.into_update();
        let sql = format!(
            "UPDATE portal.scheduled_action SET
                action_type = COALESCE($2, action_type),
                target_email = COALESCE($3, target_email),
                payload = CASE WHEN $4 THEN $5 ELSE payload END,
                scheduled_for = COALESCE($6, scheduled_for),
                updated_at = NOW()
             WHERE id = $1 AND status = $7
             RETURNING {ACTION_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, ScheduledAction>(&sql)
            .bind(id)
            .bind(update.action_type)
            .bind(update.target_email)
            .bind(set_payload)
            .bind(payload)
            .bind(update.scheduled_for)
            .bind(ScheduledActionStatus::Pending)
            .fetch_optional(self.pool)
            .await?;

        match updated {
            Some(action) => Ok(action),
            None => Err(self.guard_failure(id, None).await),
        }
    }

    /// Move an action from `from` to `to`, provided it is still in `from`.
    ///
    /// Callers check the pair against the transition table first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the action does not exist.
    /// Returns `RepositoryError::Conflict` if its status is no longer `from`.
    pub async fn set_status(
        &self,
        id: ScheduledActionId,
        from: ScheduledActionStatus,
        to: ScheduledActionStatus,
    ) -> Result<ScheduledAction, RepositoryError> {
        let sql = format!(
            "UPDATE portal.scheduled_action SET status = $3, updated_at = NOW()
             WHERE id = $1 AND status = $2
             RETURNING {ACTION_COLUMNS}"
        );
        let changed = sqlx::query_as::<_, ScheduledAction>(&sql)
            .bind(id)
            .bind(from)
            .bind(to)
            .fetch_optional(self.pool)
            .await?;

        match changed {
            Some(action) => Ok(action),
            None => Err(self.guard_failure(id, Some(to)).await),
        }
    }

    /// Delete a pending action.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the action does not exist.
    /// Returns `RepositoryError::Conflict` if it is no longer pending.
    pub async fn delete(&self, id: ScheduledActionId) -> Result<ScheduledAction, RepositoryError> {
        let sql = format!(
            "DELETE FROM portal.scheduled_action
             WHERE id = $1 AND status = $2
             RETURNING {ACTION_COLUMNS}"
        );
        let deleted = sqlx::query_as::<_, ScheduledAction>(&sql)
            .bind(id)
            .bind(ScheduledActionStatus::Pending)
            .fetch_optional(self.pool)
            .await?;

        match deleted {
            Some(action) => Ok(action),
            None => Err(self.guard_failure(id, None).await),
        }
    }

    /// Distinguish a missing row from one the status guard rejected.
    ///
    /// `target` is the status a transition asked for; `None` for edits.
    async fn guard_failure(
        &self,
        id: ScheduledActionId,
        target: Option<ScheduledActionStatus>,
    ) -> RepositoryError {
        match self.get(id).await {
            Ok(Some(action)) => RepositoryError::Conflict(refusal(action.status, target)),
            Ok(None) => RepositoryError::NotFound,
            Err(e) => e,
        }
    }
}

/// Why a guarded statement matched no row although the action exists.
fn refusal(current: ScheduledActionStatus, target: Option<ScheduledActionStatus>) -> String {
    if let Some(err) = target.and_then(|next| current.transition_to(next).err()) {
        return err.to_string();
    }
    if current.is_pending() {
        CHANGED_CONCURRENTLY.to_owned()
    } else {
        NOT_PENDING.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refusal_names_the_rejected_transition() {
        use ScheduledActionStatus::{Cancelled, Executed, Pending};

        assert_eq!(
            refusal(Executed, Some(Cancelled)),
            "cannot change status from executed to cancelled"
        );
        assert_eq!(refusal(Cancelled, None), NOT_PENDING);
        assert_eq!(refusal(Pending, None), CHANGED_CONCURRENTLY);
        assert_eq!(refusal(Pending, Some(Cancelled)), CHANGED_CONCURRENTLY);
    }
}
