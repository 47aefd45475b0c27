//! Email alias repository.

use sqlx::PgPool;

use mailroom_core::{AliasId, Email, Patch};

use super::RepositoryError;
use crate::models::Alias;

const ALIAS_COLUMNS: &str =
    "id, alias_email, target_email, description, is_active, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewAlias {
    pub alias_email: Email,
    pub target_email: Email,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AliasUpdate {
    pub target_email: Option<Email>,
    pub description: Patch<String>,
    pub is_active: Option<bool>,
}

pub struct AliasRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AliasRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Alias>, RepositoryError> {
        let sql = format!("SELECT {ALIAS_COLUMNS} FROM portal.email_alias ORDER BY alias_email");
        Ok(sqlx::query_as::<_, Alias>(&sql).fetch_all(self.pool).await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: AliasId) -> Result<Option<Alias>, RepositoryError> {
        let sql = format!("SELECT {ALIAS_COLUMNS} FROM portal.email_alias WHERE id = $1");
        Ok(sqlx::query_as::<_, Alias>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the alias address is taken.
    pub async fn create(&self, new: &NewAlias) -> Result<Alias, RepositoryError> {
        let sql = format!(
            "INSERT INTO portal.email_alias (alias_email, target_email, description, is_active)
             VALUES ($1, $2, $3, $4)
             RETURNING {ALIAS_COLUMNS}"
        );
        sqlx::query_as::<_, Alias>(&sql)
            .bind(&new.alias_email)
            .bind(&new.target_email)
            .bind(&new.description)
            .bind(new.is_active)
            .fetch_one(self.pool)
            .await
            .map_err(RepositoryError::unique("this alias already exists"))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the alias does not exist.
    pub async fn update(&self, id: AliasId, update: AliasUpdate) -> Result<Alias, RepositoryError> {
        let (set_description, description) = update.description.into_update();
        let sql = format!(
            "UPDATE portal.email_alias SET
                target_email = COALESCE($2, target_email),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {ALIAS_COLUMNS}"
        );
        sqlx::query_as::<_, Alias>(&sql)
            .bind(id)
            .bind(update.target_email)
            .bind(set_description)
            .bind(description)
            .bind(update.is_active)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the alias does not exist.
    pub async fn delete(&self, id: AliasId) -> Result<Alias, RepositoryError> {
        let sql = format!("DELETE FROM portal.email_alias WHERE id = $1 RETURNING {ALIAS_COLUMNS}");
        sqlx::query_as::<_, Alias>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }
}
