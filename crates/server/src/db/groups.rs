//! User group and membership repository.

use sqlx::PgPool;

use mailroom_core::{Email, GroupId, Patch, UserId};

use super::RepositoryError;
use crate::models::{Group, GroupMember};

const GROUP_SELECT: &str = "SELECT g.id, g.name, g.description, \
     (SELECT COUNT(*) FROM portal.user_group_member m WHERE m.group_id = g.id) AS member_count, \
     g.created_at, g.updated_at";

#[derive(Debug, Clone, Default)]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub description: Patch<String>,
}

pub struct GroupRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> GroupRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All groups with their member counts, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Group>, RepositoryError> {
        let sql = format!("{GROUP_SELECT} FROM portal.user_group g ORDER BY g.name");
        Ok(sqlx::query_as::<_, Group>(&sql).fetch_all(self.pool).await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: GroupId) -> Result<Option<Group>, RepositoryError> {
        let sql = format!("{GROUP_SELECT} FROM portal.user_group g WHERE g.id = $1");
        Ok(sqlx::query_as::<_, Group>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, id: GroupId) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM portal.user_group WHERE id = $1)")
                .bind(id)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Group, RepositoryError> {
        let group = sqlx::query_as::<_, Group>(
            "WITH g AS (
                INSERT INTO portal.user_group (name, description)
                VALUES ($1, $2)
                RETURNING *
             )
             SELECT g.id, g.name, g.description, 0::BIGINT AS member_count,
                    g.created_at, g.updated_at
             FROM g",
        )
        .bind(name)
        .bind(description)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::unique("a group with this name already exists"))?;
        Ok(group)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the group does not exist.
    /// Returns `RepositoryError::Conflict` if the new name is taken.
    pub async fn update(&self, id: GroupId, update: GroupUpdate) -> Result<Group, RepositoryError> {
        let (set_description, description) = update.description.into_update();
        let touched = sqlx::query(
            "UPDATE portal.user_group SET
                name = COALESCE($2, name),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(update.name)
        .bind(set_description)
        .bind(description)
        .execute(self.pool)
        .await
        .map_err(RepositoryError::unique("a group with this name already exists"))?
        .rows_affected();

        if touched == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete a group. Memberships go with it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the group does not exist.
    pub async fn delete(&self, id: GroupId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM portal.user_group WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Membership
    // =========================================================================

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_members(&self, id: GroupId) -> Result<Vec<GroupMember>, RepositoryError> {
        let members = sqlx::query_as::<_, GroupMember>(
            "SELECT m.user_id, u.email, m.added_at
             FROM portal.user_group_member m
             JOIN portal.app_user u ON u.id = m.user_id
             WHERE m.group_id = $1
             ORDER BY u.email",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(members)
    }

    /// Add a user to a group. Adding an existing member is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the group or user does not exist.
    pub async fn add_member(&self, id: GroupId, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO portal.user_group_member (group_id, user_id)
             VALUES ($1, $2)
             ON CONFLICT (group_id, user_id) DO NOTHING",
        )
        .bind(id)
        .bind(user_id)
        .execute(self.pool)
        .await
        .map_err(RepositoryError::unique_or_missing("already a member"))?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user is not a member.
    pub async fn remove_member(&self, id: GroupId, email: &Email) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM portal.user_group_member m
             USING portal.app_user u
             WHERE m.user_id = u.id AND m.group_id = $1 AND u.email = $2",
        )
        .bind(id)
        .bind(email)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Add every listed address that belongs to an existing user. Returns the
    /// number of new memberships.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the group does not exist.
    pub async fn bulk_add_members(
        &self,
        id: GroupId,
        emails: &[String],
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO portal.user_group_member (group_id, user_id)
             SELECT $1, id FROM portal.app_user WHERE email = ANY($2)
             ON CONFLICT (group_id, user_id) DO NOTHING",
        )
        .bind(id)
        .bind(emails)
        .execute(self.pool)
        .await
        .map_err(RepositoryError::unique_or_missing("already a member"))?;
        Ok(result.rows_affected())
    }
}
