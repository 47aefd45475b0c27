//! Database operations for the portal `PostgreSQL` schema.
//!
//! # Schema: `portal`
//!
//! ## Tables
//!
//! - `app_user` - Mailbox owners (argon2 password hashes, lockout state)
//! - `admin_user` - Console operators
//! - `mailbox_metadata` - Quota and usage per address (created lazily)
//! - `email_sending_limit` / `sending_limit_violation` - Sending-limit ledger
//! - `audit_log` - Append-only record of administrative actions
//! - `mail_domain`, `email_alias`, `user_group`, `user_group_member`,
//!   `user_template`, `announcement`, `scheduled_action`, `support_ticket`
//! - `session` - tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p mailroom-cli -- migrate
//! ```
//!
//! Queries are built at runtime with `sqlx::query_as` so the crate compiles
//! without a live database.

pub mod admin_users;
pub mod aliases;
pub mod announcements;
pub mod audit_log;
pub mod domains;
pub mod groups;
pub mod mailbox;
pub mod scheduled_actions;
pub mod sending_limits;
pub mod support_tickets;
pub mod templates;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use admin_users::AdminUserRepository;
pub use aliases::AliasRepository;
pub use announcements::AnnouncementRepository;
pub use audit_log::AuditLogRepository;
pub use domains::DomainRepository;
pub use groups::GroupRepository;
pub use mailbox::MailboxRepository;
pub use scheduled_actions::ScheduledActionRepository;
pub use sending_limits::SendingLimitRepository;
pub use support_tickets::SupportTicketRepository;
pub use templates::TemplateRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("{0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-key violation to `Conflict` with `message`; pass
    /// everything else through as `Database`.
    pub(crate) fn unique(message: &str) -> impl FnOnce(sqlx::Error) -> Self + '_ {
        move |e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return Self::Conflict(message.to_owned());
            }
            Self::Database(e)
        }
    }

    /// Map a foreign-key violation to `NotFound`; pass everything else through
    /// as `Database`. For inserts into tables keyed only by their parent.
    pub(crate) fn missing(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_foreign_key_violation()
        {
            return Self::NotFound;
        }
        Self::Database(e)
    }

    /// Map a foreign-key violation to `NotFound` and a unique-key violation to
    /// `Conflict` with `message`.
    pub(crate) fn unique_or_missing(message: &str) -> impl FnOnce(sqlx::Error) -> Self + '_ {
        move |e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return Self::Conflict(message.to_owned());
                }
                if db_err.is_foreign_key_violation() {
                    return Self::NotFound;
                }
            }
            Self::Database(e)
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Build a `%term%` pattern for `ILIKE`, escaping the wildcard characters.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" bob "), "%bob%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_conflict_message_is_displayed_verbatim() {
        let err = RepositoryError::Conflict("domain already exists".to_owned());
        assert_eq!(err.to_string(), "domain already exists");
    }
}
