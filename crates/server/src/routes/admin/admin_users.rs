//! Console operator management route handlers.
//!
//! Listing is open to every admin; changes require a super admin.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use mailroom_core::{AdminRole, AdminUserId, AuditAction, Email, Patch};

use crate::db::AdminUserRepository;
use crate::db::admin_users::{AdminUserUpdate, NewAdminUser};
use crate::error::{ApiJson, ApiPath, AppError};
use crate::middleware::{RequireAdmin, RequireSuperAdmin};
use crate::models::AdminUser;
use crate::routes::{optional_text, required_text};
use crate::services::AuditRecorder;
use crate::services::auth::{hash_password, validate_password};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/admin-users", get(list).post(create))
        .route("/admin/admin-users/{id}", put(update).delete(delete))
}

#[derive(Deserialize)]
pub struct CreateAdminRequest {
    pub email: Email,
    pub name: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: AdminRole,
}

const fn default_role() -> AdminRole {
    AdminRole::Admin
}

#[derive(Default, Deserialize)]
pub struct UpdateAdminRequest {
    #[serde(default)]
    pub name: Patch<String>,
    #[serde(default)]
    pub role: Patch<AdminRole>,
    #[serde(default)]
    pub is_active: Patch<bool>,
    #[serde(default)]
    pub password: Patch<String>,
}

impl UpdateAdminRequest {
    fn changed_fields(&self) -> Vec<&'static str> {
        [
            ("name", self.name.is_absent()),
            ("role", self.role.is_absent()),
            ("is_active", self.is_active.is_absent()),
            ("password", self.password.is_absent()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| (!absent).then_some(name))
        .collect()
    }

    /// An admin cannot demote or deactivate itself.
    fn validate(self, is_self: bool) -> Result<AdminUserUpdate, AppError> {
        let role = self.role.required("role")?;
        let is_active = self.is_active.required("is_active")?;
        if is_self && (role == Some(AdminRole::Admin) || is_active == Some(false)) {
            return Err(AppError::validation(
                "you cannot demote or deactivate your own account",
            ));
        }

        let password_hash = match self.password.required("password")? {
            Some(password) => {
                validate_password(&password)?;
                Some(hash_password(&password)?)
            }
            None => None,
        };

        Ok(AdminUserUpdate {
            name: optional_text("name", self.name.required("name")?)?,
            role,
            is_active,
            password_hash,
        })
    }
}

/// GET /admin/admin-users
#[instrument(skip(_admin, state))]
async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminUser>>, AppError> {
    Ok(Json(AdminUserRepository::new(state.pool()).list().await?))
}

/// POST /admin/admin-users (super admin)
#[instrument(skip(admin, state, body), fields(admin = %admin.email, new_admin = %body.email))]
async fn create(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateAdminRequest>,
) -> Result<(StatusCode, Json<AdminUser>), AppError> {
    validate_password(&body.password)?;
    let new = NewAdminUser {
        email: body.email,
        name: required_text("name", &body.name)?,
        role: body.role,
        password_hash: hash_password(&body.password)?,
        created_by: Some(admin.admin_id),
    };
    let created = AdminUserRepository::new(state.pool()).create(&new).await?;

    info!(admin_id = %created.id, role = %created.role, "Admin user created");
    AuditRecorder::new(state.pool())
        .record(
            &admin,
            AuditAction::AdminUserCreated,
            Some(created.email.as_str()),
            Some(json!({ "admin_id": created.id, "role": created.role })),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /admin/admin-users/{id} (super admin)
#[instrument(skip(admin, state, body), fields(admin = %admin.email))]
async fn update(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AdminUserId>,
    ApiJson(body): ApiJson<UpdateAdminRequest>,
) -> Result<Json<AdminUser>, AppError> {
    let fields = body.changed_fields();
    let update = body.validate(id == admin.admin_id)?;
    let updated = AdminUserRepository::new(state.pool())
        .update(id, update)
        .await?;

    info!(admin_id = %updated.id, "Admin user updated");
    AuditRecorder::new(state.pool())
        .record(
            &admin,
            AuditAction::AdminUserUpdated,
            Some(updated.email.as_str()),
            Some(json!({ "admin_id": updated.id, "fields": fields })),
        )
        .await?;

    Ok(Json(updated))
}

/// DELETE /admin/admin-users/{id} (super admin, not self)
#[instrument(skip(admin, state), fields(admin = %admin.email))]
async fn delete(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AdminUserId>,
) -> Result<StatusCode, AppError> {
    if id == admin.admin_id {
        return Err(AppError::validation("you cannot delete your own account"));
    }
    let deleted = AdminUserRepository::new(state.pool()).delete(id).await?;

    info!(admin_id = %deleted.id, "Admin user deleted");
    AuditRecorder::new(state.pool())
        .record(
            &admin,
            AuditAction::AdminUserDeleted,
            Some(deleted.email.as_str()),
            Some(json!({ "admin_id": deleted.id })),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_defaults_to_admin_role() {
        let body: CreateAdminRequest = serde_json::from_str(
            r#"{"email": "ops@example.org", "name": "Ops", "password": "long enough"}"#,
        )
        .unwrap();
        assert_eq!(body.role, AdminRole::Admin);
    }

    #[test]
    fn test_self_cannot_demote_or_deactivate() {
        let body: UpdateAdminRequest = serde_json::from_str(r#"{"role": "admin"}"#).unwrap();
        assert!(matches!(body.validate(true), Err(AppError::Validation(_))));

        let body: UpdateAdminRequest = serde_json::from_str(r#"{"is_active": false}"#).unwrap();
        assert!(matches!(body.validate(true), Err(AppError::Validation(_))));

        let body: UpdateAdminRequest = serde_json::from_str(r#"{"is_active": false}"#).unwrap();
        assert_eq!(body.validate(false).unwrap().is_active, Some(false));
    }

    #[test]
    fn test_password_change_is_hashed_and_checked() {
        let body: UpdateAdminRequest = serde_json::from_str(r#"{"password": "short"}"#).unwrap();
        assert!(matches!(body.validate(false), Err(AppError::Auth(_))));

        let body: UpdateAdminRequest =
            serde_json::from_str(r#"{"password": "a much longer password"}"#).unwrap();
        let update = body.validate(false).unwrap();
        assert!(update.password_hash.unwrap().starts_with("$argon2"));
    }

    #[test]
    fn test_changed_fields() {
        let body: UpdateAdminRequest =
            serde_json::from_str(r#"{"name": "Ops", "is_active": true}"#).unwrap();
        assert_eq!(body.changed_fields(), vec!["name", "is_active"]);
    }
}
