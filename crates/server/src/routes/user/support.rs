//! Support tickets opened by the logged-in user.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::db::SupportTicketRepository;
use crate::error::{ApiJson, AppError};
use crate::middleware::RequireUser;
use crate::models::SupportTicket;
use crate::routes::required_text;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/user/support/tickets", get(list).post(create))
}

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub subject: String,
    pub message: String,
}

/// GET /user/support/tickets
#[instrument(skip(user, state), fields(user_id = %user.id))]
async fn list(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<SupportTicket>>, AppError> {
    let tickets = SupportTicketRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(tickets))
}

/// POST /user/support/tickets
#[instrument(skip(user, state, body), fields(user_id = %user.id))]
async fn create(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateTicketRequest>,
) -> Result<(StatusCode, Json<SupportTicket>), AppError> {
    let subject = required_text("subject", &body.subject)?;
    let message = required_text("message", &body.message)?;

    let ticket = SupportTicketRepository::new(state.pool())
        .create(user.id, &subject, &message)
        .await?;

    info!(ticket_id = %ticket.id, "Support ticket opened");
    Ok((StatusCode::CREATED, Json(ticket)))
}
