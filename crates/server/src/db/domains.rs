//! Mail domain repository.

use sqlx::PgPool;

use mailroom_core::{DomainId, Patch};

use super::RepositoryError;
use crate::models::Domain;

const DOMAIN_COLUMNS: &str = "id, name, description, is_primary, is_active, created_at, updated_at";

/// Partial unique index allowing at most one primary domain.
const SINGLE_PRIMARY_INDEX: &str = "idx_mail_domain_single_primary";

#[derive(Debug, Clone)]
pub struct NewDomain {
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DomainUpdate {
    pub name: Option<String>,
    pub description: Patch<String>,
    pub is_active: Option<bool>,
    /// `Some(true)` promotes this domain and demotes the previous primary.
    pub is_primary: Option<bool>,
}

pub struct DomainRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DomainRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All domains, primary first then by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Domain>, RepositoryError> {
        let sql = format!(
            "SELECT {DOMAIN_COLUMNS} FROM portal.mail_domain ORDER BY is_primary DESC, name"
        );
        Ok(sqlx::query_as::<_, Domain>(&sql).fetch_all(self.pool).await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: DomainId) -> Result<Option<Domain>, RepositoryError> {
        let sql = format!("SELECT {DOMAIN_COLUMNS} FROM portal.mail_domain WHERE id = $1");
        Ok(sqlx::query_as::<_, Domain>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Create a domain. The first domain ever created becomes primary; later
    /// ones never are on creation.
    ///
    /// Two concurrent first inserts can both see an empty table; the loser
    /// trips the single-primary index and is retried as a non-primary domain.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn create(&self, new: &NewDomain) -> Result<Domain, RepositoryError> {
        match self.insert(new, true).await {
            Err(sqlx::Error::Database(ref db_err))
                if db_err.constraint() == Some(SINGLE_PRIMARY_INDEX) =>
            {
                self.insert(new, false).await
            }
            result => result,
        }
        .map_err(RepositoryError::unique("a domain with this name already exists"))
    }

    async fn insert(&self, new: &NewDomain, may_be_primary: bool) -> Result<Domain, sqlx::Error> {
        let sql = format!(
            "INSERT INTO portal.mail_domain (name, description, is_active, is_primary)
             VALUES ($1, $2, $3, $4 AND NOT EXISTS (SELECT 1 FROM portal.mail_domain))
             RETURNING {DOMAIN_COLUMNS}"
        );
        sqlx::query_as::<_, Domain>(&sql)
            .bind(&new.name)
            .bind(&new.description)
            .bind(new.is_active)
            .bind(may_be_primary)
            .fetch_one(self.pool)
            .await
    }

    /// Apply a partial update. Promotion to primary happens in one transaction
    /// with the demotion of the previous primary.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the domain does not exist.
    /// Returns `RepositoryError::Conflict` if the new name is taken.
    pub async fn update(
        &self,
        id: DomainId,
        update: DomainUpdate,
    ) -> Result<Domain, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if update.is_primary == Some(true) {
            sqlx::query(
                "UPDATE portal.mail_domain SET is_primary = FALSE, updated_at = NOW()
                 WHERE is_primary AND id <> $1",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        let (set_description, description) = update.description.into_update();
        let sql = format!(
            "UPDATE portal.mail_domain SET
                name = COALESCE($2, name),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                is_active = COALESCE($5, is_active),
                is_primary = COALESCE($6, is_primary),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {DOMAIN_COLUMNS}"
        );
        let domain = sqlx::query_as::<_, Domain>(&sql)
            .bind(id)
            .bind(update.name)
            .bind(set_description)
            .bind(description)
            .bind(update.is_active)
            .bind(update.is_primary)
            .fetch_optional(&mut *tx)
            .await
            .map_err(RepositoryError::unique("a domain with this name already exists"))?
            .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(domain)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the domain does not exist.
    pub async fn delete(&self, id: DomainId) -> Result<Domain, RepositoryError> {
        let sql = format!("DELETE FROM portal.mail_domain WHERE id = $1 RETURNING {DOMAIN_COLUMNS}");
        sqlx::query_as::<_, Domain>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Number of domains (dashboard).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM portal.mail_domain")
            .fetch_one(self.pool)
            .await?)
    }
}
