//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed email. Reported to clients as bad credentials.
    #[error("invalid credentials")]
    InvalidEmail(#[from] mailroom_core::EmailError),

    /// Wrong password or unknown account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Admin account deactivated.
    #[error("account is disabled")]
    Disabled,

    /// End-user account suspended by an admin.
    #[error("account is suspended")]
    Suspended,

    /// Too many failed logins; locked until the lock lapses or an admin
    /// unlocks it.
    #[error("account is locked")]
    Locked,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
