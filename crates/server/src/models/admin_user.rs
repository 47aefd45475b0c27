//! Console operator domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use mailroom_core::{AdminRole, AdminUserId, Email};

/// An admin console operator.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdminUser {
    pub id: AdminUserId,
    pub email: Email,
    pub name: String,
    pub role: AdminRole,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    /// Operator who created this record; `None` for the bootstrap admin.
    pub created_by: Option<AdminUserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
