//! Audit log route handler.

use axum::{Json, Router, extract::State, routing::get};
use tracing::instrument;

use crate::error::{ApiQuery, AppError};
use crate::middleware::RequireAdmin;
use crate::models::AuditEntry;
use crate::routes::SearchQuery;
use crate::services::AuditRecorder;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/admin/audit-logs", get(list))
}

/// GET /admin/audit-logs?search=
///
/// Most recent 500 entries, newest first. `search` matches admin email,
/// action type and target email case-insensitively.
#[instrument(skip(_admin, state))]
async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    let entries = AuditRecorder::new(state.pool())
        .list(query.search.as_deref())
        .await?;
    Ok(Json(entries))
}
