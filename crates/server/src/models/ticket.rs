//! Support ticket.

use chrono::{DateTime, Utc};
use serde::Serialize;

use mailroom_core::{Email, TicketId, TicketStatus, UserId};

/// A support request opened by an end user.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SupportTicket {
    pub id: TicketId,
    pub user_id: UserId,
    /// Email of the user who opened the ticket (joined).
    pub email: Email,
    pub subject: String,
    pub message: String,
    pub status: TicketStatus,
    pub admin_note: Option<String>,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
