//! Audit log entry.

use chrono::{DateTime, Utc};
use serde::Serialize;

use mailroom_core::AuditLogId;

/// One recorded administrative action. Never updated or deleted.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuditEntry {
    pub id: AuditLogId,
    pub action_type: String,
    pub admin_email: String,
    pub target_email: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}
