//! End-user (mailbox owner) domain type.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use mailroom_core::{Email, UserId};

/// A mailbox owner.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub recovery_email: Option<String>,
    pub recovery_phone: Option<String>,
    pub is_suspended: bool,
    pub suspended_reason: Option<String>,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether the account is locked at `now`.
    ///
    /// A `locked_until` in the past means the lock has lapsed.
    #[must_use]
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// Display name built from first and last name.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use chrono::TimeDelta;

    use super::*;

    pub(crate) fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: UserId::new(1),
            email: Email::parse("jane@example.org").unwrap(),
            first_name: "Jane".to_owned(),
            last_name: "Doe".to_owned(),
            date_of_birth: None,
            gender: None,
            recovery_email: None,
            recovery_phone: None,
            is_suspended: false,
            suspended_reason: None,
            failed_login_attempts: 0,
            locked_until: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_lock_in_past_is_not_locked() {
        let now = Utc::now();
        let mut user = sample_user();
        assert!(!user.is_locked_at(now));

        user.locked_until = Some(now - TimeDelta::minutes(1));
        assert!(!user.is_locked_at(now));

        user.locked_until = Some(now + TimeDelta::minutes(1));
        assert!(user.is_locked_at(now));
    }

    #[test]
    fn test_full_name() {
        let mut user = sample_user();
        assert_eq!(user.full_name(), "Jane Doe");
        user.last_name = String::new();
        assert_eq!(user.full_name(), "Jane");
    }
}
