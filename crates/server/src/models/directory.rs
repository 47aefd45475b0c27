//! Directory and policy objects: domains, aliases, groups, templates,
//! announcements and scheduled actions.

use chrono::{DateTime, Utc};
use serde::Serialize;

use mailroom_core::{
    AliasId, AnnouncementId, AnnouncementPriority, DomainId, Email, GroupId, ScheduledActionId,
    ScheduledActionStatus, TemplateId, UserId,
};

/// A mail domain served by the portal.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Domain {
    pub id: DomainId,
    pub name: String,
    pub description: Option<String>,
    pub is_primary: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An address that forwards to an existing mailbox.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Alias {
    pub id: AliasId,
    pub alias_email: Email,
    pub target_email: Email,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: Option<String>,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GroupMember {
    pub user_id: UserId,
    pub email: Email,
    pub added_at: DateTime<Utc>,
}

/// Named defaults applied when provisioning a user.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserTemplate {
    pub id: TemplateId,
    pub name: String,
    pub description: Option<String>,
    pub quota_mb: i64,
    pub tier_name: String,
    pub daily_limit: i32,
    pub hourly_limit: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Announcement {
    pub id: AnnouncementId,
    pub title: String,
    pub body: String,
    pub priority: AnnouncementPriority,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Announcement {
    /// Whether end users should see this announcement at `now`.
    #[must_use]
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.is_published && self.expires_at.is_none_or(|expiry| expiry > now)
    }
}

/// A deferred administrative action. Nothing executes these; they are
/// bookkeeping records that may be edited until they leave `pending`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ScheduledAction {
    pub id: ScheduledActionId,
    pub action_type: String,
    pub target_email: Email,
    pub payload: Option<serde_json::Value>,
    pub scheduled_for: DateTime<Utc>,
    pub status: ScheduledActionStatus,
    pub created_by: String,
    pub executed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
