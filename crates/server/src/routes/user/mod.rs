//! End-user dashboard route handlers.
//!
//! Every handler takes a [`RequireUser`] extractor and only ever reads or
//! writes the logged-in user's own records.

pub mod profile;
pub mod support;

use axum::{Json, Router, extract::State, routing::get};
use chrono::Utc;
use tracing::instrument;

use mailroom_core::MailboxUsage;

use crate::db::AnnouncementRepository;
use crate::error::AppError;
use crate::middleware::RequireUser;
use crate::models::Announcement;
use crate::services::QuotaService;
use crate::state::AppState;

/// Build the end-user router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(profile::router())
        .merge(support::router())
        .route("/user/mailbox-info", get(mailbox_info))
        .route("/user/announcements", get(announcements))
}

/// GET /user/mailbox-info
///
/// Creates the default mailbox row on first access.
#[instrument(skip(user, state), fields(user_id = %user.id))]
async fn mailbox_info(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<MailboxUsage>, AppError> {
    let usage = QuotaService::new(state.pool())
        .get_usage(&user.email)
        .await?;
    Ok(Json(usage))
}

/// GET /user/announcements
///
/// Published, unexpired announcements only.
#[instrument(skip(_user, state))]
async fn announcements(
    RequireUser(_user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Announcement>>, AppError> {
    let visible = AnnouncementRepository::new(state.pool())
        .list_visible(Utc::now())
        .await?;
    Ok(Json(visible))
}
