//! Mailbox metadata.

use chrono::{DateTime, Utc};
use serde::Serialize;

use mailroom_core::{Email, MailboxUsage};

/// Storage bookkeeping for one mailbox, keyed by address.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MailboxMetadata {
    pub email: Email,
    pub quota_bytes: i64,
    pub used_bytes: i64,
    pub updated_at: DateTime<Utc>,
}

impl MailboxMetadata {
    #[must_use]
    pub fn usage(&self) -> MailboxUsage {
        MailboxUsage::new(self.quota_bytes, self.used_bytes)
    }
}
