//! Admin user repository for database operations.

use sqlx::PgPool;

use mailroom_core::{AdminRole, AdminUserId, Email};

use super::RepositoryError;
use crate::models::AdminUser;

const ADMIN_COLUMNS: &str =
    "id, email, name, role, is_active, last_login_at, created_by, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewAdminUser {
    pub email: Email,
    pub name: String,
    pub role: AdminRole,
    pub password_hash: String,
    pub created_by: Option<AdminUserId>,
}

#[derive(Debug, Clone, Default)]
pub struct AdminUserUpdate {
    pub name: Option<String>,
    pub role: Option<AdminRole>,
    pub is_active: Option<bool>,
    pub password_hash: Option<String>,
}

#[derive(sqlx::FromRow)]
struct AdminWithHash {
    #[sqlx(flatten)]
    admin: AdminUser,
    password_hash: String,
}

/// Repository for admin user database operations.
pub struct AdminUserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminUserRepository<'a> {
    /// Create a new admin user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All console operators, by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<AdminUser>, RepositoryError> {
        let sql = format!("SELECT {ADMIN_COLUMNS} FROM portal.admin_user ORDER BY email");
        Ok(sqlx::query_as::<_, AdminUser>(&sql)
            .fetch_all(self.pool)
            .await?)
    }

    /// Get an admin user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: AdminUserId) -> Result<Option<AdminUser>, RepositoryError> {
        let sql = format!("SELECT {ADMIN_COLUMNS} FROM portal.admin_user WHERE id = $1");
        Ok(sqlx::query_as::<_, AdminUser>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Get an admin user and their password hash by email (login).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(AdminUser, String)>, RepositoryError> {
        let sql = format!(
            "SELECT {ADMIN_COLUMNS}, password_hash FROM portal.admin_user WHERE email = $1"
        );
        let row = sqlx::query_as::<_, AdminWithHash>(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(|r| (r.admin, r.password_hash)))
    }

    /// Create a new admin user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    pub async fn create(&self, new: &NewAdminUser) -> Result<AdminUser, RepositoryError> {
        let sql = format!(
            "INSERT INTO portal.admin_user (email, name, role, password_hash, created_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {ADMIN_COLUMNS}"
        );
        sqlx::query_as::<_, AdminUser>(&sql)
            .bind(&new.email)
            .bind(&new.name)
            .bind(new.role)
            .bind(&new.password_hash)
            .bind(new.created_by)
            .fetch_one(self.pool)
            .await
            .map_err(RepositoryError::unique("an admin with this email already exists"))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the admin does not exist.
    pub async fn update(
        &self,
        id: AdminUserId,
        update: AdminUserUpdate,
    ) -> Result<AdminUser, RepositoryError> {
        let sql = format!(
            "UPDATE portal.admin_user SET
                name = COALESCE($2, name),
                role = COALESCE($3, role),
                is_active = COALESCE($4, is_active),
                password_hash = COALESCE($5, password_hash),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {ADMIN_COLUMNS}"
        );
        sqlx::query_as::<_, AdminUser>(&sql)
            .bind(id)
            .bind(update.name)
            .bind(update.role)
            .bind(update.is_active)
            .bind(update.password_hash)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the admin does not exist.
    pub async fn delete(&self, id: AdminUserId) -> Result<AdminUser, RepositoryError> {
        let sql = format!("DELETE FROM portal.admin_user WHERE id = $1 RETURNING {ADMIN_COLUMNS}");
        sqlx::query_as::<_, AdminUser>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Stamp `last_login_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_login(&self, id: AdminUserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE portal.admin_user SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Number of admin users (bootstrap check in the CLI).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM portal.admin_user")
            .fetch_one(self.pool)
            .await?)
    }
}
