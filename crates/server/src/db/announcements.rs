//! Announcement repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use mailroom_core::{AnnouncementId, AnnouncementPriority, Patch};

use super::RepositoryError;
use crate::models::Announcement;

const ANNOUNCEMENT_COLUMNS: &str = "id, title, body, priority, is_published, published_at, \
     expires_at, created_by, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewAnnouncement {
    pub title: String,
    pub body: String,
    pub priority: AnnouncementPriority,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: String,
}

#[derive(Debug, Clone, Default)]
pub struct AnnouncementUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
    pub priority: Option<AnnouncementPriority>,
    pub expires_at: Patch<DateTime<Utc>>,
}

pub struct AnnouncementRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AnnouncementRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every announcement, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Announcement>, RepositoryError> {
        let sql = format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM portal.announcement
             ORDER BY created_at DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, Announcement>(&sql)
            .fetch_all(self.pool)
            .await?)
    }

    /// Published, unexpired announcements at `now`, highest priority first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_visible(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Announcement>, RepositoryError> {
        let sql = format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM portal.announcement
             WHERE is_published AND (expires_at IS NULL OR expires_at > $1)
             ORDER BY priority DESC, published_at DESC NULLS LAST, id DESC"
        );
        Ok(sqlx::query_as::<_, Announcement>(&sql)
            .bind(now)
            .fetch_all(self.pool)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: AnnouncementId) -> Result<Option<Announcement>, RepositoryError> {
        let sql = format!("SELECT {ANNOUNCEMENT_COLUMNS} FROM portal.announcement WHERE id = $1");
        Ok(sqlx::query_as::<_, Announcement>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Create an unpublished announcement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, new: &NewAnnouncement) -> Result<Announcement, RepositoryError> {
        let sql = format!(
            "INSERT INTO portal.announcement (title, body, priority, expires_at, created_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {ANNOUNCEMENT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Announcement>(&sql)
            .bind(&new.title)
            .bind(&new.body)
            .bind(new.priority)
            .bind(new.expires_at)
            .bind(&new.created_by)
            .fetch_one(self.pool)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the announcement does not exist.
    pub async fn update(
        &self,
        id: AnnouncementId,
        update: AnnouncementUpdate,
    ) -> Result<Announcement, RepositoryError> {
        let (set_expiry, expires_at) = update.expires_at.into_update();
        let sql = format!(
            "UPDATE portal.announcement SET
                title = COALESCE($2, title),
                body = COALESCE($3, body),
                priority = COALESCE($4, priority),
                expires_at = CASE WHEN $5 THEN $6 ELSE expires_at END,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {ANNOUNCEMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Announcement>(&sql)
            .bind(id)
            .bind(update.title)
            .bind(update.body)
            .bind(update.priority)
            .bind(set_expiry)
            .bind(expires_at)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Publish or unpublish. Publishing stamps `published_at`; unpublishing
    /// clears it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the announcement does not exist.
    pub async fn set_published(
        &self,
        id: AnnouncementId,
        published: bool,
    ) -> Result<Announcement, RepositoryError> {
        let sql = format!(
            "UPDATE portal.announcement SET
                is_published = $2,
                published_at = CASE WHEN $2 THEN NOW() ELSE NULL END,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {ANNOUNCEMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Announcement>(&sql)
            .bind(id)
            .bind(published)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the announcement does not exist.
    pub async fn delete(&self, id: AnnouncementId) -> Result<Announcement, RepositoryError> {
        let sql = format!(
            "DELETE FROM portal.announcement WHERE id = $1 RETURNING {ANNOUNCEMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Announcement>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }
}
