//! User group route handlers, including membership.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use mailroom_core::{AuditAction, Email, GroupId, Patch};

use crate::db::groups::GroupUpdate;
use crate::db::{GroupRepository, UserRepository};
use crate::error::{ApiJson, ApiPath, AppError};
use crate::middleware::RequireAdmin;
use crate::models::{Group, GroupMember};
use crate::routes::{found, optional_text, required_text};
use crate::services::AuditRecorder;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/groups", get(list).post(create))
        .route(
            "/admin/groups/{id}",
            get(show).put(update).delete(delete_group),
        )
        .route("/admin/groups/{id}/members", post(add_member))
        .route("/admin/groups/{id}/members/{email}", delete(remove_member))
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateGroupRequest {
    #[serde(default)]
    pub name: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub email: Email,
}

/// A group with its members.
#[derive(Debug, Serialize)]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: Group,
    pub members: Vec<GroupMember>,
}

/// GET /admin/groups
#[instrument(skip(_admin, state))]
async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Group>>, AppError> {
    Ok(Json(GroupRepository::new(state.pool()).list().await?))
}

/// GET /admin/groups/{id}
#[instrument(skip(_admin, state))]
async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<GroupId>,
) -> Result<Json<GroupDetail>, AppError> {
    let groups = GroupRepository::new(state.pool());
    let (group, members) = tokio::try_join!(groups.get(id), groups.list_members(id))?;
    Ok(Json(GroupDetail {
        group: found(group, "Group")?,
        members,
    }))
}

/// POST /admin/groups
#[instrument(skip(admin, state), fields(admin = %admin.email))]
async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Group>), AppError> {
    let name = required_text("name", &body.name)?;
    let group = GroupRepository::new(state.pool())
        .create(&name, body.description.as_deref())
        .await?;

    info!(group = %group.name, "Group created");
    AuditRecorder::new(state.pool())
        .record(
            &admin,
            AuditAction::GroupCreated,
            None,
            Some(json!({ "group_id": group.id, "name": group.name })),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(group)))
}

/// PUT /admin/groups/{id}
#[instrument(skip(admin, state), fields(admin = %admin.email))]
async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<GroupId>,
    ApiJson(body): ApiJson<UpdateGroupRequest>,
) -> Result<Json<Group>, AppError> {
    let update = GroupUpdate {
        name: optional_text("name", body.name.required("name")?)?,
        description: body.description,
    };
    let group = GroupRepository::new(state.pool()).update(id, update).await?;

    info!(group = %group.name, "Group updated");
    AuditRecorder::new(state.pool())
        .record(
            &admin,
            AuditAction::GroupUpdated,
            None,
            Some(json!({ "group_id": group.id, "name": group.name })),
        )
        .await?;

    Ok(Json(group))
}

/// DELETE /admin/groups/{id}
#[instrument(skip(admin, state), fields(admin = %admin.email))]
async fn delete_group(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<GroupId>,
) -> Result<StatusCode, AppError> {
    GroupRepository::new(state.pool()).delete(id).await?;

    info!(group_id = %id, "Group deleted");
    AuditRecorder::new(state.pool())
        .record(
            &admin,
            AuditAction::GroupDeleted,
            None,
            Some(json!({ "group_id": id })),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin/groups/{id}/members
///
/// Adding an existing member succeeds without change.
#[instrument(skip(admin, state), fields(admin = %admin.email))]
async fn add_member(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<GroupId>,
    ApiJson(body): ApiJson<AddMemberRequest>,
) -> Result<Json<Vec<GroupMember>>, AppError> {
    let groups = GroupRepository::new(state.pool());
    if !groups.exists(id).await? {
        return Err(AppError::NotFound("Group".to_owned()));
    }
    let user = UserRepository::new(state.pool())
        .get_by_email(&body.email)
        .await?
        .ok_or_else(|| AppError::validation(format!("{} is not an existing user", body.email)))?;

    groups.add_member(id, user.id).await?;

    info!(group_id = %id, target_email = %user.email, "Group member added");
    AuditRecorder::new(state.pool())
        .record(
            &admin,
            AuditAction::GroupMemberAdded,
            Some(user.email.as_str()),
            Some(json!({ "group_id": id })),
        )
        .await?;

    Ok(Json(groups.list_members(id).await?))
}

/// DELETE /admin/groups/{id}/members/{email}
#[instrument(skip(admin, state), fields(admin = %admin.email))]
async fn remove_member(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath((id, email)): ApiPath<(GroupId, Email)>,
) -> Result<StatusCode, AppError> {
    GroupRepository::new(state.pool())
        .remove_member(id, &email)
        .await?;

    info!(group_id = %id, target_email = %email, "Group member removed");
    AuditRecorder::new(state.pool())
        .record(
            &admin,
            AuditAction::GroupMemberRemoved,
            Some(email.as_str()),
            Some(json!({ "group_id": id })),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
