//! Sending-limit ledger.
//!
//! Counters are maintained by the mail transport; this service only edits
//! policy, unblocks, aggregates and records violations. There is no automatic
//! rollover of the daily or hourly counters.

use chrono::{DateTime, Local, NaiveTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, instrument};

use mailroom_core::{AuditAction, Patch, SendingLimitId, UserId, ViolationId};

use crate::db::sending_limits::{
    DEFAULT_DAILY_LIMIT, DEFAULT_HOURLY_LIMIT, NewSendingLimit, NewViolation, SendingLimitUpdate,
    VIOLATION_LIST_LIMIT,
};
use crate::db::{RepositoryError, SendingLimitRepository};
use crate::error::AppError;
use crate::models::{Actor, SendingLimit, SendingStats, Violation};
use crate::services::audit::AuditRecorder;

/// Body of `POST /admin/sending-limits`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLimitRequest {
    pub user_id: Option<UserId>,
    pub tier_name: Option<String>,
    pub daily_limit: Option<i32>,
    pub hourly_limit: Option<i32>,
}

impl CreateLimitRequest {
    /// Validate and fill in the default limits.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` when `user_id` or `tier_name` is missing
    /// or blank, or a limit is negative.
    pub fn validate(self) -> Result<NewSendingLimit, AppError> {
        let user_id = self
            .user_id
            .ok_or_else(|| AppError::validation("user_id is required"))?;
        let tier_name = self
            .tier_name
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::validation("tier_name is required"))?;
        let daily_limit =
            non_negative("daily_limit", self.daily_limit)?.unwrap_or(DEFAULT_DAILY_LIMIT);
        let hourly_limit =
            non_negative("hourly_limit", self.hourly_limit)?.unwrap_or(DEFAULT_HOURLY_LIMIT);

        Ok(NewSendingLimit {
            user_id,
            tier_name,
            daily_limit,
            hourly_limit,
        })
    }
}

/// Body of `PUT /admin/sending-limits/{id}`. Absent keys are left untouched;
/// only `custom_limit_reason` may be cleared with `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLimitRequest {
    #[serde(default)]
    pub tier_name: Patch<String>,
    #[serde(default)]
    pub daily_limit: Patch<i32>,
    #[serde(default)]
    pub hourly_limit: Patch<i32>,
    #[serde(default)]
    pub is_sending_enabled: Patch<bool>,
    #[serde(default)]
    pub custom_limit_reason: Patch<String>,
}

impl UpdateLimitRequest {
    /// # Errors
    ///
    /// Returns `AppError::Validation` for `null` on a non-nullable field, a
    /// blank tier name or a negative limit.
    pub fn validate(self) -> Result<SendingLimitUpdate, AppError> {
        let tier_name = self.tier_name.required("tier_name")?;
        if tier_name.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(AppError::validation("tier_name cannot be blank"));
        }
        Ok(SendingLimitUpdate {
            tier_name: tier_name.map(|t| t.trim().to_owned()),
            daily_limit: non_negative("daily_limit", self.daily_limit.required("daily_limit")?)?,
            hourly_limit: non_negative("hourly_limit", self.hourly_limit.required("hourly_limit")?)?,
            is_sending_enabled: self.is_sending_enabled.required("is_sending_enabled")?,
            custom_limit_reason: self.custom_limit_reason,
        })
    }
}

fn non_negative(field: &str, value: Option<i32>) -> Result<Option<i32>, AppError> {
    match value {
        Some(v) if v < 0 => Err(AppError::validation(format!("{field} cannot be negative"))),
        other => Ok(other),
    }
}

/// Start of the current local day, in UTC.
#[must_use]
pub fn local_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    now.timezone()
        .from_local_datetime(&now.date_naive().and_time(NaiveTime::MIN))
        .earliest()
        .map_or_else(|| now.with_timezone(&Utc), |midnight| midnight.with_timezone(&Utc))
}

pub struct SendingLimitService<'a> {
    repo: SendingLimitRepository<'a>,
    audit: AuditRecorder<'a>,
}

impl<'a> SendingLimitService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            repo: SendingLimitRepository::new(pool),
            audit: AuditRecorder::new(pool),
        }
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn get_all(&self) -> Result<Vec<SendingLimit>, AppError> {
        Ok(self.repo.list_all().await?)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the row does not exist.
    pub async fn get_one(&self, id: SendingLimitId) -> Result<SendingLimit, AppError> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Sending limit".to_owned()))
    }

    /// # Errors
    ///
    /// Returns `AppError::Validation` for invalid input or a duplicate row.
    /// Returns `AppError::NotFound` if the user does not exist.
    #[instrument(skip(self, actor, request), fields(admin = %actor.email))]
    pub async fn create(
        &self,
        actor: &Actor,
        request: CreateLimitRequest,
    ) -> Result<SendingLimit, AppError> {
        let new = request.validate()?;
        let limit = self.repo.create(&new).await.map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("User".to_owned()),
            other => other.into(),
        })?;

        info!(target_email = %limit.email, tier = %limit.tier_name, "Sending limit created");
        self.audit
            .record(
                actor,
                AuditAction::SendingLimitCreated,
                Some(limit.email.as_str()),
                Some(json!({
                    "tier_name": limit.tier_name,
                    "daily_limit": limit.daily_limit,
                    "hourly_limit": limit.hourly_limit,
                })),
            )
            .await?;
        Ok(limit)
    }

    /// # Errors
    ///
    /// Returns `AppError::Validation` for invalid input.
    /// Returns `AppError::NotFound` if the row does not exist.
    #[instrument(skip(self, actor, request), fields(admin = %actor.email, limit_id = %id))]
    pub async fn update(
        &self,
        actor: &Actor,
        id: SendingLimitId,
        request: UpdateLimitRequest,
    ) -> Result<SendingLimit, AppError> {
        let update = request.validate()?;
        let details = json!({
            "tier_name": update.tier_name,
            "daily_limit": update.daily_limit,
            "hourly_limit": update.hourly_limit,
            "is_sending_enabled": update.is_sending_enabled,
            "custom_limit_reason_changed": !update.custom_limit_reason.is_absent(),
        });
        let limit = self.repo.update(id, update).await?;

        info!(target_email = %limit.email, "Sending limit updated");
        self.audit
            .record(
                actor,
                AuditAction::SendingLimitUpdated,
                Some(limit.email.as_str()),
                Some(details),
            )
            .await?;
        Ok(limit)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the row does not exist.
    #[instrument(skip(self, actor), fields(admin = %actor.email, limit_id = %id))]
    pub async fn delete(&self, actor: &Actor, id: SendingLimitId) -> Result<(), AppError> {
        let limit = self.repo.delete(id).await?;

        info!(target_email = %limit.email, "Sending limit deleted");
        self.audit
            .record(
                actor,
                AuditAction::SendingLimitDeleted,
                Some(limit.email.as_str()),
                Some(json!({ "tier_name": limit.tier_name })),
            )
            .await?;
        Ok(())
    }

    /// Re-enable sending and zero both counters.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the row does not exist.
    #[instrument(skip(self, actor), fields(admin = %actor.email, limit_id = %id))]
    pub async fn unblock(&self, actor: &Actor, id: SendingLimitId) -> Result<SendingLimit, AppError> {
        let limit = self.repo.unblock(id).await?;

        info!(target_email = %limit.email, "Sending unblocked");
        self.audit
            .record(
                actor,
                AuditAction::SendingLimitUnblocked,
                Some(limit.email.as_str()),
                None,
            )
            .await?;
        Ok(limit)
    }

    /// Ledger aggregates; violations are counted from local midnight.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if a query fails.
    pub async fn stats(&self) -> Result<SendingStats, AppError> {
        let since = local_midnight(&Local::now());
        let (limits, violations_today) = tokio::try_join!(
            self.repo.list_all(),
            self.repo.count_violations_since(since),
        )?;
        Ok(SendingStats::from_limits(&limits, violations_today))
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list_violations(&self) -> Result<Vec<Violation>, AppError> {
        Ok(self.repo.list_violations(VIOLATION_LIST_LIMIT).await?)
    }

    /// Entry point for the mail transport when a send exceeds a limit.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user does not exist.
    pub async fn record_violation(&self, violation: &NewViolation) -> Result<Violation, AppError> {
        let violation = self.repo.record_violation(violation).await?;
        info!(
            user_id = %violation.user_id,
            violation_type = ?violation.violation_type,
            attempted = violation.attempted_count,
            limit = violation.limit_at_time,
            "Sending limit violation recorded"
        );
        Ok(violation)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the violation does not exist.
    #[instrument(skip(self, actor), fields(admin = %actor.email, violation_id = %id))]
    pub async fn resolve_violation(
        &self,
        actor: &Actor,
        id: ViolationId,
    ) -> Result<Violation, AppError> {
        let violation = self.repo.resolve_violation(id, actor.email.as_str()).await?;

        info!(target_email = %violation.email, "Violation resolved");
        self.audit
            .record(
                actor,
                AuditAction::SendingLimitViolationResolved,
                Some(violation.email.as_str()),
                Some(json!({ "violation_id": violation.id })),
            )
            .await?;
        Ok(violation)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{FixedOffset, Timelike};

    use super::*;

    #[test]
    fn test_create_request_defaults() {
        let request: CreateLimitRequest =
            serde_json::from_str(r#"{"user_id": 3, "tier_name": " basic "}"#).unwrap();
        let new = request.validate().unwrap();
        assert_eq!(new.user_id, UserId::new(3));
        assert_eq!(new.tier_name, "basic");
        assert_eq!(new.daily_limit, DEFAULT_DAILY_LIMIT);
        assert_eq!(new.hourly_limit, DEFAULT_HOURLY_LIMIT);
    }

    #[test]
    fn test_create_request_requires_user_and_tier() {
        let missing_user: CreateLimitRequest =
            serde_json::from_str(r#"{"tier_name": "basic"}"#).unwrap();
        assert!(missing_user.validate().is_err());

        let blank_tier: CreateLimitRequest =
            serde_json::from_str(r#"{"user_id": 1, "tier_name": "  "}"#).unwrap();
        assert!(blank_tier.validate().is_err());

        let negative: CreateLimitRequest =
            serde_json::from_str(r#"{"user_id": 1, "tier_name": "x", "daily_limit": -5}"#)
                .unwrap();
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_update_request_touches_only_present_fields() {
        let request: UpdateLimitRequest =
            serde_json::from_str(r#"{"daily_limit": 500, "custom_limit_reason": null}"#).unwrap();
        let update = request.validate().unwrap();
        assert_eq!(update.daily_limit, Some(500));
        assert_eq!(update.tier_name, None);
        assert_eq!(update.hourly_limit, None);
        assert_eq!(update.is_sending_enabled, None);
        assert!(update.custom_limit_reason.is_null());
    }

    #[test]
    fn test_update_request_rejects_null_on_required_field() {
        let request: UpdateLimitRequest =
            serde_json::from_str(r#"{"is_sending_enabled": null}"#).unwrap();
        assert!(matches!(request.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_local_midnight_uses_the_local_offset() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2026, 3, 10, 15, 30, 0).unwrap();
        let midnight = local_midnight(&now);
        assert_eq!(midnight, Utc.with_ymd_and_hms(2026, 3, 9, 22, 0, 0).unwrap());
        assert_eq!(midnight.with_timezone(&tz).hour(), 0);
    }
}
