//! Support ticket route handlers (admin side).

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post, put},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use mailroom_core::{AuditAction, TicketId, TicketStatus};

use crate::db::SupportTicketRepository;
use crate::error::{ApiJson, ApiPath, ApiQuery, AppError};
use crate::middleware::RequireAdmin;
use crate::models::SupportTicket;
use crate::routes::{found, required_text};
use crate::services::AuditRecorder;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/support/tickets", get(list))
        .route("/admin/support/tickets/{id}", get(show))
        .route("/admin/support/tickets/{id}/status", put(set_status))
        .route("/admin/support/tickets/{id}/reject", post(reject))
}

#[derive(Debug, Default, Deserialize)]
pub struct TicketQuery {
    pub status: Option<TicketStatus>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: TicketStatus,
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub note: String,
}

/// GET /admin/support/tickets?status=
#[instrument(skip(_admin, state))]
async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TicketQuery>,
) -> Result<Json<Vec<SupportTicket>>, AppError> {
    let tickets = SupportTicketRepository::new(state.pool())
        .list(query.status)
        .await?;
    Ok(Json(tickets))
}

/// GET /admin/support/tickets/{id}
#[instrument(skip(_admin, state))]
async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TicketId>,
) -> Result<Json<SupportTicket>, AppError> {
    let ticket = SupportTicketRepository::new(state.pool()).get(id).await?;
    Ok(Json(found(ticket, "Ticket")?))
}

/// PUT /admin/support/tickets/{id}/status
///
/// Checked against the ticket transition table: pending tickets may be
/// resolved or rejected, closed tickets may only be reopened.
#[instrument(skip(admin, state), fields(admin = %admin.email))]
async fn set_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TicketId>,
    ApiJson(body): ApiJson<StatusRequest>,
) -> Result<Json<SupportTicket>, AppError> {
    let tickets = SupportTicketRepository::new(state.pool());
    let current = found(tickets.get(id).await?, "Ticket")?;
    let next = current.status.transition_to(body.status)?;

    let ticket = tickets
        .set_status(id, current.status, next, admin.email.as_str())
        .await?
        .ok_or_else(|| AppError::validation("ticket status changed concurrently, reload and retry"))?;

    info!(ticket_id = %id, from = %current.status, to = %next, "Ticket status changed");
    AuditRecorder::new(state.pool())
        .record(
            &admin,
            AuditAction::TicketStatusChanged,
            Some(ticket.email.as_str()),
            Some(json!({ "ticket_id": id, "from": current.status, "to": next })),
        )
        .await?;

    Ok(Json(ticket))
}

/// POST /admin/support/tickets/{id}/reject
#[instrument(skip(admin, state, body), fields(admin = %admin.email))]
async fn reject(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TicketId>,
    ApiJson(body): ApiJson<RejectRequest>,
) -> Result<Json<SupportTicket>, AppError> {
    let note = required_text("note", &body.note)?;
    let tickets = SupportTicketRepository::new(state.pool());

    let Some(ticket) = tickets.reject(id, admin.email.as_str(), &note).await? else {
        let current = found(tickets.get(id).await?, "Ticket")?;
        return Err(current
            .status
            .transition_to(TicketStatus::Rejected)
            .err()
            .map_or_else(
                || AppError::validation("ticket status changed concurrently, reload and retry"),
                AppError::from,
            ));
    };

    info!(ticket_id = %id, "Ticket rejected");
    AuditRecorder::new(state.pool())
        .record(
            &admin,
            AuditAction::TicketRejected,
            Some(ticket.email.as_str()),
            Some(json!({ "ticket_id": id, "note": note })),
        )
        .await?;

    Ok(Json(ticket))
}
