//! Mail domain route handlers.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use mailroom_core::{AuditAction, DomainId, Patch};

use crate::db::DomainRepository;
use crate::db::domains::{DomainUpdate, NewDomain};
use crate::error::{ApiJson, ApiPath, AppError};
use crate::middleware::RequireAdmin;
use crate::models::Domain;
use crate::routes::{found, optional_text, required_text};
use crate::services::AuditRecorder;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/domains", get(list).post(create))
        .route(
            "/admin/domains/{id}",
            get(show).put(update).delete(delete),
        )
}

#[derive(Debug, Deserialize)]
pub struct CreateDomainRequest {
    pub name: String,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateDomainRequest {
    #[serde(default)]
    pub name: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub is_active: Patch<bool>,
    #[serde(default)]
    pub is_primary: Patch<bool>,
}

impl UpdateDomainRequest {
    fn validate(self) -> Result<DomainUpdate, AppError> {
        Ok(DomainUpdate {
            name: optional_text("name", self.name.required("name")?)?.map(|n| n.to_lowercase()),
            description: self.description,
            is_active: self.is_active.required("is_active")?,
            is_primary: self.is_primary.required("is_primary")?,
        })
    }
}

/// GET /admin/domains
#[instrument(skip(_admin, state))]
async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Domain>>, AppError> {
    Ok(Json(DomainRepository::new(state.pool()).list().await?))
}

/// GET /admin/domains/{id}
#[instrument(skip(_admin, state))]
async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DomainId>,
) -> Result<Json<Domain>, AppError> {
    let domain = DomainRepository::new(state.pool()).get(id).await?;
    Ok(Json(found(domain, "Domain")?))
}

/// POST /admin/domains
///
/// The first domain ever created becomes primary.
#[instrument(skip(admin, state), fields(admin = %admin.email))]
async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateDomainRequest>,
) -> Result<(StatusCode, Json<Domain>), AppError> {
    let new = NewDomain {
        name: required_text("name", &body.name)?.to_lowercase(),
        description: body.description,
        is_active: body.is_active.unwrap_or(true),
    };
    let domain = DomainRepository::new(state.pool()).create(&new).await?;

    info!(domain = %domain.name, is_primary = domain.is_primary, "Domain created");
    AuditRecorder::new(state.pool())
        .record(
            &admin,
            AuditAction::DomainCreated,
            None,
            Some(json!({ "domain_id": domain.id, "name": domain.name })),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(domain)))
}

/// PUT /admin/domains/{id}
#[instrument(skip(admin, state), fields(admin = %admin.email))]
async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DomainId>,
    ApiJson(body): ApiJson<UpdateDomainRequest>,
) -> Result<Json<Domain>, AppError> {
    let domain = DomainRepository::new(state.pool())
        .update(id, body.validate()?)
        .await?;

    info!(domain = %domain.name, "Domain updated");
    AuditRecorder::new(state.pool())
        .record(
            &admin,
            AuditAction::DomainUpdated,
            None,
            Some(json!({ "domain_id": domain.id, "name": domain.name })),
        )
        .await?;

    Ok(Json(domain))
}

/// DELETE /admin/domains/{id}
#[instrument(skip(admin, state), fields(admin = %admin.email))]
async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<DomainId>,
) -> Result<StatusCode, AppError> {
    let domain = DomainRepository::new(state.pool()).delete(id).await?;

    info!(domain = %domain.name, "Domain deleted");
    AuditRecorder::new(state.pool())
        .record(
            &admin,
            AuditAction::DomainDeleted,
            None,
            Some(json!({ "domain_id": domain.id, "name": domain.name })),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
