//! Sending-limit ledger types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use mailroom_core::{Email, SendingLimitId, UserId, ViolationId, ViolationType};

/// Per-user sending policy and counters, joined with the user's email.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SendingLimit {
    pub id: SendingLimitId,
    pub user_id: UserId,
    pub email: Email,
    pub tier_name: String,
    pub daily_limit: i32,
    pub hourly_limit: i32,
    pub emails_sent_today: i32,
    pub emails_sent_this_hour: i32,
    pub last_reset_date: DateTime<Utc>,
    pub last_reset_hour: DateTime<Utc>,
    /// Blocking is signalled by this flag alone, independent of the counters.
    pub is_sending_enabled: bool,
    pub custom_limit_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SendingLimit {
    /// Whether today's counter has reached the daily limit.
    #[must_use]
    pub const fn is_at_daily_limit(&self) -> bool {
        self.emails_sent_today >= self.daily_limit
    }
}

/// A recorded send attempt that exceeded a limit.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Violation {
    pub id: ViolationId,
    pub user_id: UserId,
    pub email: Email,
    pub violation_type: ViolationType,
    pub attempted_count: i32,
    pub limit_at_time: i32,
    pub details: Option<serde_json::Value>,
    pub action_taken: Option<String>,
    pub is_resolved: bool,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate view over the whole ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendingStats {
    pub total_users: i64,
    pub total_sent_today: i64,
    pub users_at_limit: i64,
    pub disabled_users: i64,
    pub violations_today: i64,
    pub average_sent_per_user: f64,
}

impl SendingStats {
    /// Aggregate ledger rows. `violations_today` is counted separately since
    /// violations live in their own table.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_limits(limits: &[SendingLimit], violations_today: i64) -> Self {
        let total_users = i64::try_from(limits.len()).unwrap_or(i64::MAX);
        let total_sent_today: i64 = limits
            .iter()
            .map(|l| i64::from(l.emails_sent_today))
            .sum();
        let users_at_limit = limits.iter().filter(|l| l.is_at_daily_limit()).count();
        let disabled_users = limits.iter().filter(|l| !l.is_sending_enabled).count();

        let average_sent_per_user = if total_users > 0 {
            total_sent_today as f64 / total_users as f64
        } else {
            0.0
        };

        Self {
            total_users,
            total_sent_today,
            users_at_limit: i64::try_from(users_at_limit).unwrap_or(i64::MAX),
            disabled_users: i64::try_from(disabled_users).unwrap_or(i64::MAX),
            violations_today,
            average_sent_per_user,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn limit(sent: i32, daily: i32, enabled: bool) -> SendingLimit {
        let now = Utc::now();
        SendingLimit {
            id: SendingLimitId::new(1),
            user_id: UserId::new(1),
            email: Email::parse("a@example.org").unwrap(),
            tier_name: "standard".to_owned(),
            daily_limit: daily,
            hourly_limit: 50,
            emails_sent_today: sent,
            emails_sent_this_hour: 0,
            last_reset_date: now,
            last_reset_hour: now,
            is_sending_enabled: enabled,
            custom_limit_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_stats_empty_ledger() {
        let stats = SendingStats::from_limits(&[], 0);
        assert_eq!(stats.total_users, 0);
        assert_eq!(stats.total_sent_today, 0);
        assert!(stats.average_sent_per_user.abs() < f64::EPSILON);
    }

    #[test]
    fn test_stats_aggregates() {
        let limits = [
            limit(100, 100, true),
            limit(20, 100, false),
            limit(150, 100, true),
        ];
        let stats = SendingStats::from_limits(&limits, 4);

        assert_eq!(stats.total_users, 3);
        assert_eq!(stats.total_sent_today, 270);
        assert_eq!(stats.users_at_limit, 2);
        assert_eq!(stats.disabled_users, 1);
        assert_eq!(stats.violations_today, 4);
        assert!((stats.average_sent_per_user - 90.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_limit_counts_as_at_limit() {
        assert!(limit(0, 0, true).is_at_daily_limit());
    }
}
