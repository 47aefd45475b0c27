//! Admin console route handlers.
//!
//! Every handler takes a [`RequireAdmin`](crate::middleware::RequireAdmin)
//! (or `RequireSuperAdmin`) extractor, so a missing session answers 401 and an
//! end-user session answers 403 before any handler code runs.

pub mod admin_users;
pub mod aliases;
pub mod announcements;
pub mod audit_logs;
pub mod dashboard;
pub mod domains;
pub mod groups;
pub mod scheduled_actions;
pub mod sending_limits;
pub mod support;
pub mod templates;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the admin console router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(dashboard::router())
        .merge(users::router())
        .merge(sending_limits::router())
        .merge(audit_logs::router())
        .merge(domains::router())
        .merge(aliases::router())
        .merge(groups::router())
        .merge(templates::router())
        .merge(announcements::router())
        .merge(scheduled_actions::router())
        .merge(support::router())
        .merge(admin_users::router())
}
