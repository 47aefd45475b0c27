//! Announcement route handlers.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use mailroom_core::{AnnouncementId, AnnouncementPriority, AuditAction, Patch};

use crate::db::AnnouncementRepository;
use crate::db::announcements::{AnnouncementUpdate, NewAnnouncement};
use crate::error::{ApiJson, ApiPath, AppError};
use crate::middleware::RequireAdmin;
use crate::models::Announcement;
use crate::routes::{found, optional_text, required_text};
use crate::services::AuditRecorder;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/announcements", get(list).post(create))
        .route(
            "/admin/announcements/{id}",
            get(show).put(update).delete(delete),
        )
        .route("/admin/announcements/{id}/publish", post(publish))
        .route("/admin/announcements/{id}/unpublish", post(unpublish))
}

#[derive(Debug, Deserialize)]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub priority: AnnouncementPriority,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAnnouncementRequest {
    #[serde(default)]
    pub title: Patch<String>,
    #[serde(default)]
    pub body: Patch<String>,
    #[serde(default)]
    pub priority: Patch<AnnouncementPriority>,
    #[serde(default)]
    pub expires_at: Patch<DateTime<Utc>>,
}

impl UpdateAnnouncementRequest {
    fn validate(self) -> Result<AnnouncementUpdate, AppError> {
        Ok(AnnouncementUpdate {
            title: optional_text("title", self.title.required("title")?)?,
            body: optional_text("body", self.body.required("body")?)?,
            priority: self.priority.required("priority")?,
            expires_at: self.expires_at,
        })
    }
}

/// GET /admin/announcements
#[instrument(skip(_admin, state))]
async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Announcement>>, AppError> {
    Ok(Json(AnnouncementRepository::new(state.pool()).list().await?))
}

/// GET /admin/announcements/{id}
#[instrument(skip(_admin, state))]
async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AnnouncementId>,
) -> Result<Json<Announcement>, AppError> {
    let announcement = AnnouncementRepository::new(state.pool()).get(id).await?;
    Ok(Json(found(announcement, "Announcement")?))
}

/// POST /admin/announcements
///
/// New announcements start unpublished.
#[instrument(skip(admin, state, body), fields(admin = %admin.email))]
async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateAnnouncementRequest>,
) -> Result<(StatusCode, Json<Announcement>), AppError> {
    let new = NewAnnouncement {
        title: required_text("title", &body.title)?,
        body: required_text("body", &body.body)?,
        priority: body.priority,
        expires_at: body.expires_at,
        created_by: admin.email.to_string(),
    };
    let announcement = AnnouncementRepository::new(state.pool()).create(&new).await?;

    info!(announcement_id = %announcement.id, "Announcement created");
    AuditRecorder::new(state.pool())
        .record(
            &admin,
            AuditAction::AnnouncementCreated,
            None,
            Some(json!({ "announcement_id": announcement.id, "title": announcement.title })),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(announcement)))
}

/// PUT /admin/announcements/{id}
#[instrument(skip(admin, state, body), fields(admin = %admin.email))]
async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AnnouncementId>,
    ApiJson(body): ApiJson<UpdateAnnouncementRequest>,
) -> Result<Json<Announcement>, AppError> {
    let announcement = AnnouncementRepository::new(state.pool())
        .update(id, body.validate()?)
        .await?;

    info!(announcement_id = %announcement.id, "Announcement updated");
    AuditRecorder::new(state.pool())
        .record(
            &admin,
            AuditAction::AnnouncementUpdated,
            None,
            Some(json!({ "announcement_id": announcement.id, "title": announcement.title })),
        )
        .await?;

    Ok(Json(announcement))
}

async fn set_published(
    state: &AppState,
    admin: &crate::models::Actor,
    id: AnnouncementId,
    published: bool,
) -> Result<Announcement, AppError> {
    let announcement = AnnouncementRepository::new(state.pool())
        .set_published(id, published)
        .await?;

    let action = if published {
        AuditAction::AnnouncementPublished
    } else {
        AuditAction::AnnouncementUnpublished
    };
    info!(announcement_id = %announcement.id, published, "Announcement visibility changed");
    AuditRecorder::new(state.pool())
        .record(
            admin,
            action,
            None,
            Some(json!({ "announcement_id": announcement.id, "title": announcement.title })),
        )
        .await?;

    Ok(announcement)
}

/// POST /admin/announcements/{id}/publish
#[instrument(skip(admin, state), fields(admin = %admin.email))]
async fn publish(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AnnouncementId>,
) -> Result<Json<Announcement>, AppError> {
    Ok(Json(set_published(&state, &admin, id, true).await?))
}

/// POST /admin/announcements/{id}/unpublish
#[instrument(skip(admin, state), fields(admin = %admin.email))]
async fn unpublish(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AnnouncementId>,
) -> Result<Json<Announcement>, AppError> {
    Ok(Json(set_published(&state, &admin, id, false).await?))
}

/// DELETE /admin/announcements/{id}
#[instrument(skip(admin, state), fields(admin = %admin.email))]
async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AnnouncementId>,
) -> Result<StatusCode, AppError> {
    let announcement = AnnouncementRepository::new(state.pool()).delete(id).await?;

    info!(announcement_id = %announcement.id, "Announcement deleted");
    AuditRecorder::new(state.pool())
        .record(
            &admin,
            AuditAction::AnnouncementDeleted,
            None,
            Some(json!({ "announcement_id": announcement.id, "title": announcement.title })),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
