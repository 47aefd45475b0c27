//! Audit log action tags.

use serde::{Deserialize, Serialize};

/// Kind of administrative mutation recorded in the audit log.
///
/// The string form is what lands in `audit_log.action_type` and what the
/// audit search matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    // Users
    UserCreated,
    UserUpdated,
    UserSuspended,
    UserUnsuspended,
    UserUnlocked,
    UserDeleted,
    UserPasswordReset,
    QuotaUpdated,
    BulkSuspend,
    BulkUnsuspend,
    BulkDelete,
    BulkUpdateQuota,
    BulkAssignGroup,

    // Sending limits
    SendingLimitCreated,
    SendingLimitUpdated,
    SendingLimitDeleted,
    SendingLimitUnblocked,
    SendingLimitViolationResolved,

    // Directory and policy objects
    DomainCreated,
    DomainUpdated,
    DomainDeleted,
    AliasCreated,
    AliasUpdated,
    AliasDeleted,
    GroupCreated,
    GroupUpdated,
    GroupDeleted,
    GroupMemberAdded,
    GroupMemberRemoved,
    TemplateCreated,
    TemplateUpdated,
    TemplateDeleted,
    AnnouncementCreated,
    AnnouncementUpdated,
    AnnouncementPublished,
    AnnouncementUnpublished,
    AnnouncementDeleted,
    ScheduledActionCreated,
    ScheduledActionUpdated,
    ScheduledActionCancelled,
    ScheduledActionDeleted,
    TicketStatusChanged,
    TicketRejected,

    // Console operators
    AdminUserCreated,
    AdminUserUpdated,
    AdminUserDeleted,
}

impl AuditAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserCreated => "user_created",
            Self::UserUpdated => "user_updated",
            Self::UserSuspended => "user_suspended",
            Self::UserUnsuspended => "user_unsuspended",
            Self::UserUnlocked => "user_unlocked",
            Self::UserDeleted => "user_deleted",
            Self::UserPasswordReset => "user_password_reset",
            Self::QuotaUpdated => "quota_updated",
            Self::BulkSuspend => "bulk_suspend",
            Self::BulkUnsuspend => "bulk_unsuspend",
            Self::BulkDelete => "bulk_delete",
            Self::BulkUpdateQuota => "bulk_update_quota",
            Self::BulkAssignGroup => "bulk_assign_group",
            Self::SendingLimitCreated => "sending_limit_created",
            Self::SendingLimitUpdated => "sending_limit_updated",
            Self::SendingLimitDeleted => "sending_limit_deleted",
            Self::SendingLimitUnblocked => "sending_limit_unblocked",
            Self::SendingLimitViolationResolved => "sending_limit_violation_resolved",
            Self::DomainCreated => "domain_created",
            Self::DomainUpdated => "domain_updated",
            Self::DomainDeleted => "domain_deleted",
            Self::AliasCreated => "alias_created",
            Self::AliasUpdated => "alias_updated",
            Self::AliasDeleted => "alias_deleted",
            Self::GroupCreated => "group_created",
            Self::GroupUpdated => "group_updated",
            Self::GroupDeleted => "group_deleted",
            Self::GroupMemberAdded => "group_member_added",
            Self::GroupMemberRemoved => "group_member_removed",
            Self::TemplateCreated => "template_created",
            Self::TemplateUpdated => "template_updated",
            Self::TemplateDeleted => "template_deleted",
            Self::AnnouncementCreated => "announcement_created",
            Self::AnnouncementUpdated => "announcement_updated",
            Self::AnnouncementPublished => "announcement_published",
            Self::AnnouncementUnpublished => "announcement_unpublished",
            Self::AnnouncementDeleted => "announcement_deleted",
            Self::ScheduledActionCreated => "scheduled_action_created",
            Self::ScheduledActionUpdated => "scheduled_action_updated",
            Self::ScheduledActionCancelled => "scheduled_action_cancelled",
            Self::ScheduledActionDeleted => "scheduled_action_deleted",
            Self::TicketStatusChanged => "ticket_status_changed",
            Self::TicketRejected => "ticket_rejected",
            Self::AdminUserCreated => "admin_user_created",
            Self::AdminUserUpdated => "admin_user_updated",
            Self::AdminUserDeleted => "admin_user_deleted",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action applied to many users at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    Suspend,
    Unsuspend,
    Delete,
    UpdateQuota,
    AssignGroup,
}

impl BulkAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Suspend => "suspend",
            Self::Unsuspend => "unsuspend",
            Self::Delete => "delete",
            Self::UpdateQuota => "update_quota",
            Self::AssignGroup => "assign_group",
        }
    }

    /// The summary audit tag written once per bulk request.
    #[must_use]
    pub const fn audit_action(self) -> AuditAction {
        match self {
            Self::Suspend => AuditAction::BulkSuspend,
            Self::Unsuspend => AuditAction::BulkUnsuspend,
            Self::Delete => AuditAction::BulkDelete,
            Self::UpdateQuota => AuditAction::BulkUpdateQuota,
            Self::AssignGroup => AuditAction::BulkAssignGroup,
        }
    }
}

impl std::str::FromStr for BulkAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "suspend" => Ok(Self::Suspend),
            "unsuspend" => Ok(Self::Unsuspend),
            "delete" => Ok(Self::Delete),
            "update_quota" => Ok(Self::UpdateQuota),
            "assign_group" => Ok(Self::AssignGroup),
            _ => Err(format!("unknown bulk action: {s}")),
        }
    }
}
