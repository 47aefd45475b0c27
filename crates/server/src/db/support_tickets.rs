//! Support ticket repository.

use sqlx::PgPool;

use mailroom_core::{TicketId, TicketStatus, UserId};

use super::RepositoryError;
use crate::models::SupportTicket;

const TICKET_SELECT: &str = "SELECT t.id, t.user_id, u.email, t.subject, t.message, t.status, \
     t.admin_note, t.resolved_by, t.resolved_at, t.created_at, t.updated_at";

pub struct SupportTicketRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SupportTicketRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Open a pending ticket for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn create(
        &self,
        user_id: UserId,
        subject: &str,
        message: &str,
    ) -> Result<SupportTicket, RepositoryError> {
        let sql = format!(
            "WITH t AS (
                INSERT INTO portal.support_ticket (user_id, subject, message)
                VALUES ($1, $2, $3)
                RETURNING *
             )
             {TICKET_SELECT}
             FROM t JOIN portal.app_user u ON u.id = t.user_id"
        );
        sqlx::query_as::<_, SupportTicket>(&sql)
            .bind(user_id)
            .bind(subject)
            .bind(message)
            .fetch_one(self.pool)
            .await
            .map_err(RepositoryError::missing)
    }

    /// A user's own tickets, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<SupportTicket>, RepositoryError> {
        let sql = format!(
            "{TICKET_SELECT}
             FROM portal.support_ticket t
             JOIN portal.app_user u ON u.id = t.user_id
             WHERE t.user_id = $1
             ORDER BY t.created_at DESC, t.id DESC"
        );
        Ok(sqlx::query_as::<_, SupportTicket>(&sql)
            .bind(user_id)
            .fetch_all(self.pool)
            .await?)
    }

    /// All tickets, newest first, optionally restricted to one status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<TicketStatus>,
    ) -> Result<Vec<SupportTicket>, RepositoryError> {
        let sql = format!(
            "{TICKET_SELECT}
             FROM portal.support_ticket t
             JOIN portal.app_user u ON u.id = t.user_id
             WHERE $1::portal.ticket_status IS NULL OR t.status = $1
             ORDER BY t.created_at DESC, t.id DESC"
        );
        Ok(sqlx::query_as::<_, SupportTicket>(&sql)
            .bind(status)
            .fetch_all(self.pool)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: TicketId) -> Result<Option<SupportTicket>, RepositoryError> {
        let sql = format!(
            "{TICKET_SELECT}
             FROM portal.support_ticket t
             JOIN portal.app_user u ON u.id = t.user_id
             WHERE t.id = $1"
        );
        Ok(sqlx::query_as::<_, SupportTicket>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Move a ticket from `from` to `to`. The caller checks the transition;
    /// the `status = from` guard makes the write conditional on nobody having
    /// moved it in between. Closing stamps the resolver; reopening clears it.
    ///
    /// Returns `None` when the ticket is no longer in `from`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_status(
        &self,
        id: TicketId,
        from: TicketStatus,
        to: TicketStatus,
        actor: &str,
    ) -> Result<Option<SupportTicket>, RepositoryError> {
        let sql = format!(
            "WITH t AS (
                UPDATE portal.support_ticket SET
                    status = $3,
                    resolved_by = CASE WHEN $3 = 'pending' THEN NULL ELSE $4 END,
                    resolved_at = CASE WHEN $3 = 'pending' THEN NULL ELSE NOW() END,
                    updated_at = NOW()
                WHERE id = $1 AND status = $2
                RETURNING *
             )
             {TICKET_SELECT}
             FROM t JOIN portal.app_user u ON u.id = t.user_id"
        );
        Ok(sqlx::query_as::<_, SupportTicket>(&sql)
            .bind(id)
            .bind(from)
            .bind(to)
            .bind(actor)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Reject a pending ticket with an explanatory note.
    ///
    /// Returns `None` when the ticket is no longer pending.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn reject(
        &self,
        id: TicketId,
        actor: &str,
        note: &str,
    ) -> Result<Option<SupportTicket>, RepositoryError> {
        let sql = format!(
            "WITH t AS (
                UPDATE portal.support_ticket SET
                    status = 'rejected',
                    admin_note = $3,
                    resolved_by = $2,
                    resolved_at = NOW(),
                    updated_at = NOW()
                WHERE id = $1 AND status = 'pending'
                RETURNING *
             )
             {TICKET_SELECT}
             FROM t JOIN portal.app_user u ON u.id = t.user_id"
        );
        Ok(sqlx::query_as::<_, SupportTicket>(&sql)
            .bind(id)
            .bind(actor)
            .bind(note)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Number of pending tickets (dashboard).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_open(&self) -> Result<i64, RepositoryError> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM portal.support_ticket WHERE status = 'pending'")
                .fetch_one(self.pool)
                .await?,
        )
    }
}
