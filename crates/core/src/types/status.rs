//! Status and role enums for portal entities.
//!
//! Lifecycle statuses carry their transition tables so that handlers cannot
//! write a status the entity is not allowed to reach.

use serde::{Deserialize, Serialize};

/// A status change that the transition table does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot change status from {from} to {to}")]
pub struct StatusTransitionError {
    /// Current status.
    pub from: &'static str,
    /// Requested status.
    pub to: &'static str,
}

/// Admin role with different permission levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "portal.admin_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Full access including console operator management.
    SuperAdmin,
    /// Full access to mailbox users and policy objects.
    Admin,
}

impl AdminRole {
    /// Stable string form used in the database and JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AdminRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Self::SuperAdmin),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid admin role: {s}")),
        }
    }
}

/// Scheduled action lifecycle.
///
/// ```text
/// pending ──► executed
///    │
///    └──────► cancelled
/// ```
///
/// Both `executed` and `cancelled` are terminal. Only pending actions may be
/// edited or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "portal.scheduled_action_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledActionStatus {
    #[default]
    Pending,
    Executed,
    Cancelled,
}

impl ScheduledActionStatus {
    /// Stable string form used in the database and JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Executed => "executed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the action can still be edited, cancelled or deleted.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether `next` is reachable from this status.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Executed | Self::Cancelled)
        )
    }

    /// Check a transition against the table.
    ///
    /// # Errors
    ///
    /// Returns `StatusTransitionError` if `next` is not reachable.
    pub const fn transition_to(self, next: Self) -> Result<Self, StatusTransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(StatusTransitionError {
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }
}

impl std::fmt::Display for ScheduledActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Support ticket lifecycle.
///
/// ```text
/// pending ──► resolved ──┐
///    │                   │ (reopen)
///    └──────► rejected ──┴──► pending
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "portal.ticket_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Pending,
    Resolved,
    Rejected,
}

impl TicketStatus {
    /// Stable string form used in the database and JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Rejected => "rejected",
        }
    }

    /// Whether `next` is reachable from this status.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Resolved | Self::Rejected)
                | (Self::Resolved | Self::Rejected, Self::Pending)
        )
    }

    /// Check a transition against the table.
    ///
    /// # Errors
    ///
    /// Returns `StatusTransitionError` if `next` is not reachable.
    pub const fn transition_to(self, next: Self) -> Result<Self, StatusTransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(StatusTransitionError {
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }

    /// Whether an admin has closed the ticket.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Resolved | Self::Rejected)
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "resolved" => Ok(Self::Resolved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("invalid ticket status: {s}")),
        }
    }
}

/// Display priority of an announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "portal.announcement_priority", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementPriority {
    Low,
    #[default]
    Normal,
    High,
}

/// Which sending window a violation exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "portal.violation_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    Daily,
    Hourly,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_role_roundtrip() {
        for role in [AdminRole::SuperAdmin, AdminRole::Admin] {
            assert_eq!(role.to_string().parse::<AdminRole>(), Ok(role));
        }
        assert!("viewer".parse::<AdminRole>().is_err());
    }

    #[test]
    fn test_scheduled_action_transitions() {
        use ScheduledActionStatus::{Cancelled, Executed, Pending};

        assert!(Pending.can_transition_to(Executed));
        assert!(Pending.can_transition_to(Cancelled));

        for terminal in [Executed, Cancelled] {
            assert!(!terminal.is_pending());
            for next in [Pending, Executed, Cancelled] {
                assert!(!terminal.can_transition_to(next));
            }
        }
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_scheduled_action_transition_error_names_states() {
        let err = ScheduledActionStatus::Executed
            .transition_to(ScheduledActionStatus::Cancelled)
            .err();
        assert_eq!(
            err.map(|e| e.to_string()).as_deref(),
            Some("cannot change status from executed to cancelled")
        );
    }

    #[test]
    fn test_ticket_transitions() {
        use TicketStatus::{Pending, Rejected, Resolved};

        assert!(Pending.can_transition_to(Resolved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Resolved.can_transition_to(Pending));
        assert!(Rejected.can_transition_to(Pending));

        assert!(!Resolved.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Resolved));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_ticket_status_serde_is_snake_case() {
        let json = serde_json::to_string(&TicketStatus::Resolved).ok();
        assert_eq!(json.as_deref(), Some("\"resolved\""));
        assert_eq!("rejected".parse::<TicketStatus>(), Ok(TicketStatus::Rejected));
        assert!("closed".parse::<TicketStatus>().is_err());
    }
}
