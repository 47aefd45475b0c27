//! User template route handlers.
//!
//! A template is a named set of defaults (quota, tier, limits) for new
//! accounts.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use mailroom_core::{AuditAction, DEFAULT_QUOTA_BYTES, Patch, TemplateId, bytes_to_mb, mb_to_bytes};

use crate::db::TemplateRepository;
use crate::db::sending_limits::{DEFAULT_DAILY_LIMIT, DEFAULT_HOURLY_LIMIT};
use crate::db::templates::{NewTemplate, TemplateUpdate};
use crate::error::{ApiJson, ApiPath, AppError};
use crate::middleware::RequireAdmin;
use crate::models::UserTemplate;
use crate::routes::{found, optional_text, required_text};
use crate::services::AuditRecorder;
use crate::state::AppState;

const DEFAULT_TEMPLATE_QUOTA_MB: i64 = bytes_to_mb(DEFAULT_QUOTA_BYTES);
const DEFAULT_TEMPLATE_TIER: &str = "standard";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/templates", get(list).post(create))
        .route(
            "/admin/templates/{id}",
            get(show).put(update).delete(delete),
        )
}

#[derive(Debug, Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,
    pub description: Option<String>,
    pub quota_mb: Option<i64>,
    pub tier_name: Option<String>,
    pub daily_limit: Option<i32>,
    pub hourly_limit: Option<i32>,
}

impl CreateTemplateRequest {
    fn validate(self) -> Result<NewTemplate, AppError> {
        let quota_mb = self.quota_mb.unwrap_or(DEFAULT_TEMPLATE_QUOTA_MB);
        mb_to_bytes(quota_mb)?;
        Ok(NewTemplate {
            name: required_text("name", &self.name)?,
            description: self.description,
            quota_mb,
            tier_name: optional_text("tier_name", self.tier_name)?
                .unwrap_or_else(|| DEFAULT_TEMPLATE_TIER.to_owned()),
            daily_limit: limit("daily_limit", self.daily_limit)?
                .unwrap_or(DEFAULT_DAILY_LIMIT),
            hourly_limit: limit("hourly_limit", self.hourly_limit)?
                .unwrap_or(DEFAULT_HOURLY_LIMIT),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTemplateRequest {
    #[serde(default)]
    pub name: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub quota_mb: Patch<i64>,
    #[serde(default)]
    pub tier_name: Patch<String>,
    #[serde(default)]
    pub daily_limit: Patch<i32>,
    #[serde(default)]
    pub hourly_limit: Patch<i32>,
}

impl UpdateTemplateRequest {
    fn validate(self) -> Result<TemplateUpdate, AppError> {
        let quota_mb = self.quota_mb.required("quota_mb")?;
        if let Some(mb) = quota_mb {
            mb_to_bytes(mb)?;
        }
        Ok(TemplateUpdate {
            name: optional_text("name", self.name.required("name")?)?,
            description: self.description,
            quota_mb,
            tier_name: optional_text("tier_name", self.tier_name.required("tier_name")?)?,
            daily_limit: limit("daily_limit", self.daily_limit.required("daily_limit")?)?,
            hourly_limit: limit("hourly_limit", self.hourly_limit.required("hourly_limit")?)?,
        })
    }
}

fn limit(field: &str, value: Option<i32>) -> Result<Option<i32>, AppError> {
    match value {
        Some(v) if v < 0 => Err(AppError::validation(format!("{field} cannot be negative"))),
        other => Ok(other),
    }
}

/// GET /admin/templates
#[instrument(skip(_admin, state))]
async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserTemplate>>, AppError> {
    Ok(Json(TemplateRepository::new(state.pool()).list().await?))
}

/// GET /admin/templates/{id}
#[instrument(skip(_admin, state))]
async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TemplateId>,
) -> Result<Json<UserTemplate>, AppError> {
    let template = TemplateRepository::new(state.pool()).get(id).await?;
    Ok(Json(found(template, "Template")?))
}

/// POST /admin/templates
#[instrument(skip(admin, state), fields(admin = %admin.email))]
async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<UserTemplate>), AppError> {
    let template = TemplateRepository::new(state.pool())
        .create(&body.validate()?)
        .await?;

    info!(template = %template.name, "Template created");
    AuditRecorder::new(state.pool())
        .record(
            &admin,
            AuditAction::TemplateCreated,
            None,
            Some(json!({ "template_id": template.id, "name": template.name })),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(template)))
}

/// PUT /admin/templates/{id}
#[instrument(skip(admin, state), fields(admin = %admin.email))]
async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TemplateId>,
    ApiJson(body): ApiJson<UpdateTemplateRequest>,
) -> Result<Json<UserTemplate>, AppError> {
    let template = TemplateRepository::new(state.pool())
        .update(id, body.validate()?)
        .await?;

    info!(template = %template.name, "Template updated");
    AuditRecorder::new(state.pool())
        .record(
            &admin,
            AuditAction::TemplateUpdated,
            None,
            Some(json!({ "template_id": template.id, "name": template.name })),
        )
        .await?;

    Ok(Json(template))
}

/// DELETE /admin/templates/{id}
#[instrument(skip(admin, state), fields(admin = %admin.email))]
async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TemplateId>,
) -> Result<StatusCode, AppError> {
    let template = TemplateRepository::new(state.pool()).delete(id).await?;

    info!(template = %template.name, "Template deleted");
    AuditRecorder::new(state.pool())
        .record(
            &admin,
            AuditAction::TemplateDeleted,
            None,
            Some(json!({ "template_id": template.id, "name": template.name })),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_fills_defaults() {
        let body: CreateTemplateRequest = serde_json::from_str(r#"{"name": "Staff"}"#).unwrap();
        let new = body.validate().unwrap();
        assert_eq!(new.name, "Staff");
        assert_eq!(new.quota_mb, DEFAULT_TEMPLATE_QUOTA_MB);
        assert_eq!(new.tier_name, DEFAULT_TEMPLATE_TIER);
        assert_eq!(new.quota_mb, 5120);
        assert_eq!(new.daily_limit, DEFAULT_DAILY_LIMIT);
        assert_eq!(new.hourly_limit, DEFAULT_HOURLY_LIMIT);
    }

    #[test]
    fn test_create_rejects_negative_values() {
        let body: CreateTemplateRequest =
            serde_json::from_str(r#"{"name": "Staff", "quota_mb": -1}"#).unwrap();
        assert!(matches!(body.validate(), Err(AppError::Validation(_))));

        let body: CreateTemplateRequest =
            serde_json::from_str(r#"{"name": "Staff", "hourly_limit": -5}"#).unwrap();
        assert!(matches!(body.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_update_null_on_required_field_is_rejected() {
        let body: UpdateTemplateRequest =
            serde_json::from_str(r#"{"tier_name": null}"#).unwrap();
        assert!(matches!(body.validate(), Err(AppError::Validation(_))));

        let body: UpdateTemplateRequest =
            serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert!(body.validate().unwrap().description.is_null());
    }
}
