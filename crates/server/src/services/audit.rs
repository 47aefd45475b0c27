//! Audit recorder.
//!
//! Called once after each administrative mutation has been committed. A
//! failed write surfaces as an error but never undoes the mutation.

use serde_json::Value;
use sqlx::PgPool;
use tracing::error;

use mailroom_core::AuditAction;

use crate::db::audit_log::{AUDIT_LIST_LIMIT, AuditLogRepository, NewAuditEntry};
use crate::error::AppError;
use crate::models::{Actor, AuditEntry};

pub struct AuditRecorder<'a> {
    repo: AuditLogRepository<'a>,
}

impl<'a> AuditRecorder<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            repo: AuditLogRepository::new(pool),
        }
    }

    /// Append one entry attributed to `actor`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the insert fails.
    pub async fn record(
        &self,
        actor: &Actor,
        action: AuditAction,
        target: Option<&str>,
        details: Option<Value>,
    ) -> Result<AuditEntry, AppError> {
        let entry = NewAuditEntry {
            action_type: action.as_str(),
            admin_email: actor.email.as_str(),
            target_email: target,
            details,
            ip_address: actor.ip.clone(),
        };
        self.repo.insert(&entry).await.map_err(|e| {
            error!(action = %action, admin = %actor.email, error = %e, "Failed to write audit entry");
            AppError::from(e)
        })
    }

    /// Most recent entries, optionally searched.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<AuditEntry>, AppError> {
        Ok(self.repo.list(search, AUDIT_LIST_LIMIT).await?)
    }
}
