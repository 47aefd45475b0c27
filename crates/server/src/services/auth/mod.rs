//! Authentication service.
//!
//! Local password authentication for console operators and end users. Both
//! kinds of account store argon2id hashes. End-user logins are subject to the
//! lockout policy; admin logins are not.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use rand::{Rng, distr::Alphanumeric};
use sqlx::PgPool;
use tracing::{info, warn};

use mailroom_core::Email;

use crate::config::LockoutPolicy;
use crate::db::{AdminUserRepository, UserRepository};
use crate::models::{AdminUser, User};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Length of generated temporary passwords.
const TEMPORARY_PASSWORD_LENGTH: usize = 16;

/// Authentication service.
pub struct AuthService<'a> {
    admins: AdminUserRepository<'a>,
    users: UserRepository<'a>,
    lockout: &'a LockoutPolicy,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, lockout: &'a LockoutPolicy) -> Self {
        Self {
            admins: AdminUserRepository::new(pool),
            users: UserRepository::new(pool),
            lockout,
        }
    }

    /// Login as a console operator.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::Disabled` if the admin has been deactivated.
    pub async fn login_admin(&self, email: &str, password: &str) -> Result<AdminUser, AuthError> {
        let email = Email::parse(email)?;

        let (admin, password_hash) = self
            .admins
            .get_with_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if !admin.is_active {
            return Err(AuthError::Disabled);
        }

        self.admins.record_login(admin.id).await?;
        info!(admin_id = %admin.id, email = %admin.email, "Admin logged in");
        Ok(admin)
    }

    /// Login as an end user.
    ///
    /// A locked account is refused before the password is checked. A wrong
    /// password counts towards the lockout; reaching the configured maximum
    /// locks the account for the configured duration. Success resets the
    /// counter.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::Locked` if the account is currently locked.
    /// Returns `AuthError::Suspended` if the account is suspended.
    pub async fn login_user(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        let (user, password_hash) = self
            .users
            .get_with_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let now = Utc::now();
        if user.is_locked_at(now) {
            return Err(AuthError::Locked);
        }

        if let Err(e) = verify_password(password, &password_hash) {
            let user = self
                .users
                .record_login_failure(
                    user.id,
                    self.lockout.max_failed_attempts,
                    now + self.lockout.duration(),
                )
                .await?;
            if user.is_locked_at(now) {
                warn!(
                    user_id = %user.id,
                    attempts = user.failed_login_attempts,
                    "Account locked after repeated login failures"
                );
            }
            return Err(e);
        }

        if user.is_suspended {
            return Err(AuthError::Suspended);
        }

        self.users.record_login_success(user.id).await?;
        info!(user_id = %user.id, "User logged in");
        Ok(user)
    }
}

// =============================================================================
// Password helpers
// =============================================================================

/// Check a new password against the length requirement.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` if the password does not match or
/// the stored hash cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Random alphanumeric password handed out by an admin reset.
#[must_use]
pub fn generate_temporary_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TEMPORARY_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse battery", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_unparseable_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("12345678").is_ok());
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_temporary_password_shape() {
        let first = generate_temporary_password();
        let second = generate_temporary_password();
        assert_eq!(first.len(), TEMPORARY_PASSWORD_LENGTH);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(validate_password(&first).is_ok());
        assert_ne!(first, second);
    }
}
