//! User repository for database operations.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use mailroom_core::{Email, Patch, UserId};

use super::{RepositoryError, like_pattern};
use crate::models::User;

const USER_COLUMNS: &str = "id, email, first_name, last_name, date_of_birth, gender, \
     recovery_email, recovery_phone, is_suspended, suspended_reason, failed_login_attempts, \
     locked_until, last_login_at, created_at, updated_at";

/// Fields for a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

/// Profile changes. `None` / `Patch::Absent` leave the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Patch<NaiveDate>,
    pub gender: Patch<String>,
    pub recovery_email: Patch<String>,
    pub recovery_phone: Patch<String>,
}

/// Counters shown on the admin dashboard.
#[derive(Debug, Clone, Copy, serde::Serialize, sqlx::FromRow)]
pub struct UserCounts {
    pub total_users: i64,
    pub suspended_users: i64,
    pub locked_users: i64,
}

#[derive(sqlx::FromRow)]
struct UserWithHash {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List users, newest first, optionally filtered by a case-insensitive
    /// search over email and names.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<User>, RepositoryError> {
        let pattern = search.filter(|s| !s.trim().is_empty()).map(like_pattern);
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM portal.app_user
             WHERE $1::text IS NULL
                OR email ILIKE $1
                OR first_name ILIKE $1
                OR last_name ILIKE $1
             ORDER BY created_at DESC"
        );

        let users = sqlx::query_as::<_, User>(&sql)
            .bind(pattern)
            .fetch_all(self.pool)
            .await?;
        Ok(users)
    }

    /// Get a user by email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM portal.app_user WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM portal.app_user WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    /// Get a user together with their password hash (for login).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let sql = format!(
            "SELECT {USER_COLUMNS}, password_hash FROM portal.app_user WHERE email = $1"
        );
        let row = sqlx::query_as::<_, UserWithHash>(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(|r| (r.user, r.password_hash)))
    }

    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    pub async fn create(&self, new: &NewUser) -> Result<User, RepositoryError> {
        let sql = format!(
            "INSERT INTO portal.app_user (email, first_name, last_name, password_hash)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&new.email)
            .bind(&new.first_name)
            .bind(&new.last_name)
            .bind(&new.password_hash)
            .fetch_one(self.pool)
            .await
            .map_err(RepositoryError::unique("a user with this email already exists"))
    }

    /// Apply a profile update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn update_profile(
        &self,
        email: &Email,
        update: ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        let (set_dob, dob) = update.date_of_birth.into_update();
        let (set_gender, gender) = update.gender.into_update();
        let (set_recovery_email, recovery_email) = update.recovery_email.into_update();
        let (set_recovery_phone, recovery_phone) = update.recovery_phone.into_update();

        let sql = format!(
            "UPDATE portal.app_user SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                date_of_birth = CASE WHEN $4 THEN $5 ELSE date_of_birth END,
                gender = CASE WHEN $6 THEN $7 ELSE gender END,
                recovery_email = CASE WHEN $8 THEN $9 ELSE recovery_email END,
                recovery_phone = CASE WHEN $10 THEN $11 ELSE recovery_phone END,
                updated_at = NOW()
             WHERE email = $1
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .bind(update.first_name)
            .bind(update.last_name)
            .bind(set_dob)
            .bind(dob)
            .bind(set_gender)
            .bind(gender)
            .bind(set_recovery_email)
            .bind(recovery_email)
            .bind(set_recovery_phone)
            .bind(recovery_phone)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Set or clear the suspension flag. Re-applying the same state is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_suspended(
        &self,
        email: &Email,
        suspended: bool,
        reason: Option<&str>,
    ) -> Result<User, RepositoryError> {
        let sql = format!(
            "UPDATE portal.app_user SET
                is_suspended = $2,
                suspended_reason = CASE WHEN $2 THEN $3 ELSE NULL END,
                updated_at = NOW()
             WHERE email = $1
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .bind(suspended)
            .bind(reason)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Clear the failed-login counter and any lock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn unlock(&self, email: &Email) -> Result<User, RepositoryError> {
        let sql = format!(
            "UPDATE portal.app_user SET
                failed_login_attempts = 0,
                locked_until = NULL,
                updated_at = NOW()
             WHERE email = $1
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Replace the password hash. When `clear_lockout` is set the failed-login
    /// counter and lock are reset as well.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_password_hash(
        &self,
        email: &Email,
        password_hash: &str,
        clear_lockout: bool,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE portal.app_user SET
                password_hash = $2,
                failed_login_attempts = CASE WHEN $3 THEN 0 ELSE failed_login_attempts END,
                locked_until = CASE WHEN $3 THEN NULL ELSE locked_until END,
                updated_at = NOW()
             WHERE email = $1",
        )
        .bind(email)
        .bind(password_hash)
        .bind(clear_lockout)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a user. Dependent rows go with it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn delete(&self, email: &Email) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM portal.app_user WHERE email = $1")
            .bind(email)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Count a failed login; lock the account once `max_attempts` is reached.
    ///
    /// A lock that has already lapsed starts a fresh count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn record_login_failure(
        &self,
        id: UserId,
        max_attempts: i32,
        lock_until: DateTime<Utc>,
    ) -> Result<User, RepositoryError> {
        let sql = format!(
            "UPDATE portal.app_user SET
                failed_login_attempts = s.attempts,
                locked_until = CASE
                    WHEN s.attempts >= $2 THEN $3
                    WHEN s.lapsed THEN NULL
                    ELSE locked_until
                END
             FROM (
                SELECT
                    locked_until IS NOT NULL AND locked_until <= NOW() AS lapsed,
                    CASE
                        WHEN locked_until IS NOT NULL AND locked_until <= NOW() THEN 1
                        ELSE failed_login_attempts + 1
                    END AS attempts
                FROM portal.app_user
                WHERE id = $1
             ) AS s
             WHERE portal.app_user.id = $1
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(max_attempts)
            .bind(lock_until)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Reset the failure counter and stamp `last_login_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_login_success(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE portal.app_user SET
                failed_login_attempts = 0,
                locked_until = NULL,
                last_login_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    // =========================================================================
    // Bulk operations (one statement each)
    // =========================================================================

    /// Set the suspension flag on every listed address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn bulk_set_suspended(
        &self,
        emails: &[String],
        suspended: bool,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE portal.app_user SET
                is_suspended = $2,
                suspended_reason = CASE WHEN $2 THEN suspended_reason ELSE NULL END,
                updated_at = NOW()
             WHERE email = ANY($1)",
        )
        .bind(emails)
        .bind(suspended)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete every listed address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn bulk_delete(&self, emails: &[String]) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM portal.app_user WHERE email = ANY($1)")
            .bind(emails)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Dashboard counters.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn counts(&self) -> Result<UserCounts, RepositoryError> {
        let counts = sqlx::query_as::<_, UserCounts>(
            "SELECT
                COUNT(*) AS total_users,
                COUNT(*) FILTER (WHERE is_suspended) AS suspended_users,
                COUNT(*) FILTER (WHERE locked_until > NOW()) AS locked_users
             FROM portal.app_user",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(counts)
    }
}
