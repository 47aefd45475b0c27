//! User template repository.

use sqlx::PgPool;

use mailroom_core::{Patch, TemplateId};

use super::RepositoryError;
use crate::models::UserTemplate;

const TEMPLATE_COLUMNS: &str = "id, name, description, quota_mb, tier_name, daily_limit, \
     hourly_limit, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub name: String,
    pub description: Option<String>,
    pub quota_mb: i64,
    pub tier_name: String,
    pub daily_limit: i32,
    pub hourly_limit: i32,
}

#[derive(Debug, Clone, Default)]
pub struct TemplateUpdate {
    pub name: Option<String>,
    pub description: Patch<String>,
    pub quota_mb: Option<i64>,
    pub tier_name: Option<String>,
    pub daily_limit: Option<i32>,
    pub hourly_limit: Option<i32>,
}

pub struct TemplateRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TemplateRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<UserTemplate>, RepositoryError> {
        let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM portal.user_template ORDER BY name");
        Ok(sqlx::query_as::<_, UserTemplate>(&sql)
            .fetch_all(self.pool)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: TemplateId) -> Result<Option<UserTemplate>, RepositoryError> {
        let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM portal.user_template WHERE id = $1");
        Ok(sqlx::query_as::<_, UserTemplate>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn create(&self, new: &NewTemplate) -> Result<UserTemplate, RepositoryError> {
        let sql = format!(
            "INSERT INTO portal.user_template
                (name, description, quota_mb, tier_name, daily_limit, hourly_limit)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {TEMPLATE_COLUMNS}"
        );
        sqlx::query_as::<_, UserTemplate>(&sql)
            .bind(&new.name)
            .bind(&new.description)
            .bind(new.quota_mb)
            .bind(&new.tier_name)
            .bind(new.daily_limit)
            .bind(new.hourly_limit)
            .fetch_one(self.pool)
            .await
            .map_err(RepositoryError::unique("a template with this name already exists"))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the template does not exist.
    /// Returns `RepositoryError::Conflict` if the new name is taken.
    pub async fn update(
        &self,
        id: TemplateId,
        update: TemplateUpdate,
    ) -> Result<UserTemplate, RepositoryError> {
        let (set_description, description) = update.description.into_update();
        let sql = format!(
            "UPDATE portal.user_template SET
                name = COALESCE($2, name),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                quota_mb = COALESCE($5, quota_mb),
                tier_name = COALESCE($6, tier_name),
                daily_limit = COALESCE($7, daily_limit),
                hourly_limit = COALESCE($8, hourly_limit),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {TEMPLATE_COLUMNS}"
        );
        sqlx::query_as::<_, UserTemplate>(&sql)
            .bind(id)
            .bind(update.name)
            .bind(set_description)
            .bind(description)
            .bind(update.quota_mb)
            .bind(update.tier_name)
            .bind(update.daily_limit)
            .bind(update.hourly_limit)
            .fetch_optional(self.pool)
            .await
            .map_err(RepositoryError::unique("a template with this name already exists"))?
            .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the template does not exist.
    pub async fn delete(&self, id: TemplateId) -> Result<UserTemplate, RepositoryError> {
        let sql =
            format!("DELETE FROM portal.user_template WHERE id = $1 RETURNING {TEMPLATE_COLUMNS}");
        sqlx::query_as::<_, UserTemplate>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }
}
