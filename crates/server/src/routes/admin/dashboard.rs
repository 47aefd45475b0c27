//! Admin dashboard route handler.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use tracing::instrument;

use crate::db::{DomainRepository, SupportTicketRepository, UserRepository};
use crate::error::AppError;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/admin/dashboard", get(dashboard))
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_users: i64,
    pub suspended_users: i64,
    pub locked_users: i64,
    pub total_domains: i64,
    pub open_tickets: i64,
}

/// GET /admin/dashboard
#[instrument(skip(_admin, state))]
async fn dashboard(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, AppError> {
    let users = UserRepository::new(state.pool());
    let domains = DomainRepository::new(state.pool());
    let tickets = SupportTicketRepository::new(state.pool());

    let (counts, total_domains, open_tickets) =
        tokio::try_join!(users.counts(), domains.count(), tickets.count_open())?;

    Ok(Json(DashboardStats {
        total_users: counts.total_users,
        suspended_users: counts.suspended_users,
        locked_users: counts.locked_users,
        total_domains,
        open_tickets,
    }))
}
