//! User management route handlers.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};
use serde::Deserialize;
use tracing::instrument;

use mailroom_core::{Email, MailboxUsage};

use crate::error::{ApiJson, ApiPath, ApiQuery, AppError};
use crate::middleware::RequireAdmin;
use crate::models::User;
use crate::routes::{SearchQuery, optional_json};
use crate::services::lifecycle::{
    BulkOutcome, BulkRequest, CreateUserRequest, PasswordReset, UpdateProfileRequest, UserDetail,
};
use crate::services::{LifecycleService, QuotaService};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list).post(create))
        .route("/admin/users/bulk", post(bulk))
        .route(
            "/admin/users/{email}",
            get(show).put(update).delete(delete),
        )
        .route("/admin/users/{email}/suspend", post(suspend))
        .route("/admin/users/{email}/unsuspend", post(unsuspend))
        .route("/admin/users/{email}/unlock", post(unlock))
        .route("/admin/users/{email}/reset-password", post(reset_password))
        .route("/admin/users/{email}/quota", put(set_quota))
}

#[derive(Debug, Default, Deserialize)]
pub struct SuspendRequest {
    pub reason: Option<String>,
}

#[derive(Default, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuotaRequest {
    pub quota_mb: i64,
}

/// GET /admin/users?search=
#[instrument(skip(_admin, state))]
async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    let users = LifecycleService::new(state.pool())
        .list(query.search.as_deref())
        .await?;
    Ok(Json(users))
}

/// GET /admin/users/{email}
#[instrument(skip(_admin, state))]
async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(email): ApiPath<Email>,
) -> Result<Json<UserDetail>, AppError> {
    Ok(Json(LifecycleService::new(state.pool()).get(&email).await?))
}

/// POST /admin/users
#[instrument(skip(admin, state, body))]
async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = LifecycleService::new(state.pool())
        .create(&admin, body)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /admin/users/{email}
#[instrument(skip(admin, state, body))]
async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(email): ApiPath<Email>,
    ApiJson(body): ApiJson<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    let user = LifecycleService::new(state.pool())
        .update(&admin, &email, body)
        .await?;
    Ok(Json(user))
}

/// DELETE /admin/users/{email}
#[instrument(skip(admin, state))]
async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(email): ApiPath<Email>,
) -> Result<StatusCode, AppError> {
    LifecycleService::new(state.pool())
        .delete(&admin, &email)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin/users/{email}/suspend with an optional `{"reason": ...}`.
#[instrument(skip(admin, state, body))]
async fn suspend(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(email): ApiPath<Email>,
    body: Bytes,
) -> Result<Json<User>, AppError> {
    let request: SuspendRequest = optional_json(&body)?;
    let reason = request
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    let user = LifecycleService::new(state.pool())
        .suspend(&admin, &email, reason)
        .await?;
    Ok(Json(user))
}

/// POST /admin/users/{email}/unsuspend
#[instrument(skip(admin, state))]
async fn unsuspend(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(email): ApiPath<Email>,
) -> Result<Json<User>, AppError> {
    let user = LifecycleService::new(state.pool())
        .unsuspend(&admin, &email)
        .await?;
    Ok(Json(user))
}

/// POST /admin/users/{email}/unlock
#[instrument(skip(admin, state))]
async fn unlock(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(email): ApiPath<Email>,
) -> Result<Json<User>, AppError> {
    let user = LifecycleService::new(state.pool())
        .unlock(&admin, &email)
        .await?;
    Ok(Json(user))
}

/// POST /admin/users/{email}/reset-password with an optional
/// `{"new_password": ...}`. Without one a temporary password is generated and
/// returned in the response.
#[instrument(skip(admin, state, body))]
async fn reset_password(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(email): ApiPath<Email>,
    body: Bytes,
) -> Result<Json<PasswordReset>, AppError> {
    let request: ResetPasswordRequest = optional_json(&body)?;
    let reset = LifecycleService::new(state.pool())
        .reset_password(&admin, &email, request.new_password)
        .await?;
    Ok(Json(reset))
}

/// PUT /admin/users/{email}/quota
#[instrument(skip(admin, state))]
async fn set_quota(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(email): ApiPath<Email>,
    ApiJson(body): ApiJson<QuotaRequest>,
) -> Result<Json<MailboxUsage>, AppError> {
    let usage = QuotaService::new(state.pool())
        .set_quota(&admin, &email, body.quota_mb)
        .await?;
    Ok(Json(usage))
}

/// POST /admin/users/bulk
#[instrument(skip(admin, state, body))]
async fn bulk(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<BulkRequest>,
) -> Result<Json<BulkOutcome>, AppError> {
    let outcome = LifecycleService::new(state.pool())
        .bulk_apply(&admin, body)
        .await?;
    Ok(Json(outcome))
}
