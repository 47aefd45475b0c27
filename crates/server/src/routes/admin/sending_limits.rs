//! Sending-limit route handlers.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tracing::instrument;

use mailroom_core::{SendingLimitId, ViolationId};

use crate::error::{ApiJson, ApiPath, AppError};
use crate::middleware::RequireAdmin;
use crate::models::{SendingLimit, SendingStats, Violation};
use crate::services::SendingLimitService;
use crate::services::sending_limits::{CreateLimitRequest, UpdateLimitRequest};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/sending-limits", get(list).post(create))
        .route("/admin/sending-limits/stats", get(stats))
        .route("/admin/sending-limits/violations", get(violations))
        .route(
            "/admin/sending-limits/violations/{id}/resolve",
            post(resolve_violation),
        )
        .route(
            "/admin/sending-limits/{id}",
            get(show).put(update).delete(delete),
        )
        .route("/admin/sending-limits/{id}/unblock", post(unblock))
}

/// GET /admin/sending-limits
#[instrument(skip(_admin, state))]
async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<SendingLimit>>, AppError> {
    Ok(Json(SendingLimitService::new(state.pool()).get_all().await?))
}

/// GET /admin/sending-limits/{id}
#[instrument(skip(_admin, state))]
async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<SendingLimitId>,
) -> Result<Json<SendingLimit>, AppError> {
    Ok(Json(SendingLimitService::new(state.pool()).get_one(id).await?))
}

/// POST /admin/sending-limits
#[instrument(skip(admin, state))]
async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateLimitRequest>,
) -> Result<(StatusCode, Json<SendingLimit>), AppError> {
    let limit = SendingLimitService::new(state.pool())
        .create(&admin, body)
        .await?;
    Ok((StatusCode::CREATED, Json(limit)))
}

/// PUT /admin/sending-limits/{id}
#[instrument(skip(admin, state))]
async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<SendingLimitId>,
    ApiJson(body): ApiJson<UpdateLimitRequest>,
) -> Result<Json<SendingLimit>, AppError> {
    let limit = SendingLimitService::new(state.pool())
        .update(&admin, id, body)
        .await?;
    Ok(Json(limit))
}

/// DELETE /admin/sending-limits/{id}
#[instrument(skip(admin, state))]
async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<SendingLimitId>,
) -> Result<StatusCode, AppError> {
    SendingLimitService::new(state.pool())
        .delete(&admin, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin/sending-limits/{id}/unblock
#[instrument(skip(admin, state))]
async fn unblock(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<SendingLimitId>,
) -> Result<Json<SendingLimit>, AppError> {
    let limit = SendingLimitService::new(state.pool())
        .unblock(&admin, id)
        .await?;
    Ok(Json(limit))
}

/// GET /admin/sending-limits/stats
#[instrument(skip(_admin, state))]
async fn stats(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<SendingStats>, AppError> {
    Ok(Json(SendingLimitService::new(state.pool()).stats().await?))
}

/// GET /admin/sending-limits/violations
#[instrument(skip(_admin, state))]
async fn violations(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Violation>>, AppError> {
    Ok(Json(
        SendingLimitService::new(state.pool())
            .list_violations()
            .await?,
    ))
}

/// POST /admin/sending-limits/violations/{id}/resolve
#[instrument(skip(admin, state))]
async fn resolve_violation(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ViolationId>,
) -> Result<Json<Violation>, AppError> {
    let violation = SendingLimitService::new(state.pool())
        .resolve_violation(&admin, id)
        .await?;
    Ok(Json(violation))
}
