//! Email alias route handlers.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use mailroom_core::{AliasId, AuditAction, Email, Patch};

use crate::db::aliases::{AliasUpdate, NewAlias};
use crate::db::{AliasRepository, UserRepository};
use crate::error::{ApiJson, ApiPath, AppError};
use crate::middleware::RequireAdmin;
use crate::models::Alias;
use crate::routes::found;
use crate::services::AuditRecorder;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/aliases", get(list).post(create))
        .route(
            "/admin/aliases/{id}",
            get(show).put(update).delete(delete),
        )
}

#[derive(Debug, Deserialize)]
pub struct CreateAliasRequest {
    pub alias_email: Email,
    pub target_email: Email,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAliasRequest {
    #[serde(default)]
    pub target_email: Patch<Email>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub is_active: Patch<bool>,
}

/// Aliases may only forward to an existing mailbox user.
async fn ensure_target_exists(state: &AppState, target: &Email) -> Result<(), AppError> {
    if UserRepository::new(state.pool())
        .get_by_email(target)
        .await?
        .is_none()
    {
        return Err(AppError::validation(format!(
            "target {target} is not an existing user"
        )));
    }
    Ok(())
}

/// GET /admin/aliases
#[instrument(skip(_admin, state))]
async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Alias>>, AppError> {
    Ok(Json(AliasRepository::new(state.pool()).list().await?))
}

/// GET /admin/aliases/{id}
#[instrument(skip(_admin, state))]
async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AliasId>,
) -> Result<Json<Alias>, AppError> {
    let alias = AliasRepository::new(state.pool()).get(id).await?;
    Ok(Json(found(alias, "Alias")?))
}

/// POST /admin/aliases
#[instrument(skip(admin, state), fields(admin = %admin.email))]
async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateAliasRequest>,
) -> Result<(StatusCode, Json<Alias>), AppError> {
    if body.alias_email == body.target_email {
        return Err(AppError::validation("an alias cannot point to itself"));
    }
    ensure_target_exists(&state, &body.target_email).await?;

    let new = NewAlias {
        alias_email: body.alias_email,
        target_email: body.target_email,
        description: body.description,
        is_active: body.is_active.unwrap_or(true),
    };
    let alias = AliasRepository::new(state.pool()).create(&new).await?;

    info!(alias = %alias.alias_email, target_email = %alias.target_email, "Alias created");
    AuditRecorder::new(state.pool())
        .record(
            &admin,
            AuditAction::AliasCreated,
            Some(alias.target_email.as_str()),
            Some(json!({ "alias_id": alias.id, "alias_email": alias.alias_email })),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(alias)))
}

/// PUT /admin/aliases/{id}
#[instrument(skip(admin, state), fields(admin = %admin.email))]
async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AliasId>,
    ApiJson(body): ApiJson<UpdateAliasRequest>,
) -> Result<Json<Alias>, AppError> {
    let target_email = body.target_email.required("target_email")?;
    if let Some(target) = &target_email {
        ensure_target_exists(&state, target).await?;
    }

    let update = AliasUpdate {
        target_email,
        description: body.description,
        is_active: body.is_active.required("is_active")?,
    };
    let alias = AliasRepository::new(state.pool()).update(id, update).await?;

    info!(alias = %alias.alias_email, "Alias updated");
    AuditRecorder::new(state.pool())
        .record(
            &admin,
            AuditAction::AliasUpdated,
            Some(alias.target_email.as_str()),
            Some(json!({ "alias_id": alias.id, "alias_email": alias.alias_email })),
        )
        .await?;

    Ok(Json(alias))
}

/// DELETE /admin/aliases/{id}
#[instrument(skip(admin, state), fields(admin = %admin.email))]
async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AliasId>,
) -> Result<StatusCode, AppError> {
    let alias = AliasRepository::new(state.pool()).delete(id).await?;

    info!(alias = %alias.alias_email, "Alias deleted");
    AuditRecorder::new(state.pool())
        .record(
            &admin,
            AuditAction::AliasDeleted,
            Some(alias.target_email.as_str()),
            Some(json!({ "alias_id": alias.id, "alias_email": alias.alias_email })),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
