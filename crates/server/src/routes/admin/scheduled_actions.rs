//! Scheduled action route handlers.
//!
//! Actions are recorded for a future time and stay editable only while
//! pending. Nothing in the portal executes them.

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

use mailroom_core::{AuditAction, Email, Patch, ScheduledActionId, ScheduledActionStatus};

use crate::db::ScheduledActionRepository;
use crate::db::scheduled_actions::{NewScheduledAction, ScheduledActionUpdate};
use crate::error::{ApiJson, ApiPath, AppError};
use crate::middleware::RequireAdmin;
use crate::models::{Actor, ScheduledAction};
use crate::routes::{found, optional_text, required_text};
use crate::services::AuditRecorder;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/scheduled-actions", get(list).post(create))
        .route(
            "/admin/scheduled-actions/{id}",
            get(show).put(update).delete(delete),
        )
        .route("/admin/scheduled-actions/{id}/cancel", post(cancel))
}

#[derive(Debug, Deserialize)]
pub struct CreateScheduledActionRequest {
    pub action_type: String,
    pub target_email: Email,
    pub payload: Option<serde_json::Value>,
    pub scheduled_for: DateTime<Utc>,
}

impl CreateScheduledActionRequest {
    fn validate(self, now: DateTime<Utc>, created_by: &Email) -> Result<NewScheduledAction, AppError> {
        require_future(self.scheduled_for, now)?;
        Ok(NewScheduledAction {
            action_type: required_text("action_type", &self.action_type)?,
            target_email: self.target_email,
            payload: self.payload,
            scheduled_for: self.scheduled_for,
            created_by: created_by.to_string(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateScheduledActionRequest {
    #[serde(default)]
    pub action_type: Patch<String>,
    #[serde(default)]
    pub target_email: Patch<Email>,
    #[serde(default)]
    pub payload: Patch<serde_json::Value>,
    #[serde(default)]
    pub scheduled_for: Patch<DateTime<Utc>>,
}

impl UpdateScheduledActionRequest {
    fn validate(self, now: DateTime<Utc>) -> Result<ScheduledActionUpdate, AppError> {
        let scheduled_for = self.scheduled_for.required("scheduled_for")?;
        if let Some(at) = scheduled_for {
            require_future(at, now)?;
        }
        Ok(ScheduledActionUpdate {
            action_type: optional_text("action_type", self.action_type.required("action_type")?)?,
            target_email: self.target_email.required("target_email")?,
            payload: self.payload,
            scheduled_for,
        })
    }
}

fn require_future(at: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), AppError> {
    if at <= now {
        return Err(AppError::validation("scheduled_for must be in the future"));
    }
    Ok(())
}

async fn audit(
    state: &AppState,
    admin: &Actor,
    action: AuditAction,
    scheduled: &ScheduledAction,
) -> Result<(), AppError> {
    AuditRecorder::new(state.pool())
        .record(
            admin,
            action,
            Some(scheduled.target_email.as_str()),
            Some(json!({
                "scheduled_action_id": scheduled.id,
                "action_type": scheduled.action_type,
                "scheduled_for": scheduled.scheduled_for,
            })),
        )
        .await?;
    Ok(())
}

/// GET /admin/scheduled-actions
#[instrument(skip(_admin, state))]
async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<ScheduledAction>>, AppError> {
    Ok(Json(ScheduledActionRepository::new(state.pool()).list().await?))
}

/// GET /admin/scheduled-actions/{id}
#[instrument(skip(_admin, state))]
async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ScheduledActionId>,
) -> Result<Json<ScheduledAction>, AppError> {
    let scheduled = ScheduledActionRepository::new(state.pool()).get(id).await?;
    Ok(Json(found(scheduled, "Scheduled action")?))
}

/// POST /admin/scheduled-actions
#[instrument(skip(admin, state, body), fields(admin = %admin.email))]
async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateScheduledActionRequest>,
) -> Result<(StatusCode, Json<ScheduledAction>), AppError> {
    let new = body.validate(Utc::now(), &admin.email)?;
    let scheduled = ScheduledActionRepository::new(state.pool())
        .create(&new)
        .await?;

    info!(
        scheduled_action_id = %scheduled.id,
        target_email = %scheduled.target_email,
        scheduled_for = %scheduled.scheduled_for,
        "Scheduled action created"
    );
    audit(&state, &admin, AuditAction::ScheduledActionCreated, &scheduled).await?;

    Ok((StatusCode::CREATED, Json(scheduled)))
}

/// PUT /admin/scheduled-actions/{id}
#[instrument(skip(admin, state, body), fields(admin = %admin.email))]
async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ScheduledActionId>,
    ApiJson(body): ApiJson<UpdateScheduledActionRequest>,
) -> Result<Json<ScheduledAction>, AppError> {
    let scheduled = ScheduledActionRepository::new(state.pool())
        .update(id, body.validate(Utc::now())?)
        .await?;

    info!(scheduled_action_id = %scheduled.id, "Scheduled action updated");
    audit(&state, &admin, AuditAction::ScheduledActionUpdated, &scheduled).await?;

    Ok(Json(scheduled))
}

/// POST /admin/scheduled-actions/{id}/cancel
///
/// Checked against the transition table: only pending actions can be
/// cancelled.
#[instrument(skip(admin, state), fields(admin = %admin.email))]
async fn cancel(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ScheduledActionId>,
) -> Result<Json<ScheduledAction>, AppError> {
    let actions = ScheduledActionRepository::new(state.pool());
    let current = found(actions.get(id).await?, "Scheduled action")?;
    let next = current.status.transition_to(ScheduledActionStatus::Cancelled)?;
    let scheduled = actions.set_status(id, current.status, next).await?;

    info!(scheduled_action_id = %scheduled.id, "Scheduled action cancelled");
    audit(&state, &admin, AuditAction::ScheduledActionCancelled, &scheduled).await?;

    Ok(Json(scheduled))
}

/// DELETE /admin/scheduled-actions/{id}
#[instrument(skip(admin, state), fields(admin = %admin.email))]
async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ScheduledActionId>,
) -> Result<StatusCode, AppError> {
    let scheduled = ScheduledActionRepository::new(state.pool())
        .delete(id)
        .await?;

    info!(scheduled_action_id = %scheduled.id, "Scheduled action deleted");
    audit(&state, &admin, AuditAction::ScheduledActionDeleted, &scheduled).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn create_body(scheduled_for: DateTime<Utc>) -> CreateScheduledActionRequest {
        CreateScheduledActionRequest {
            action_type: "suspend".to_owned(),
            target_email: Email::parse("jane@example.org").unwrap(),
            payload: None,
            scheduled_for,
        }
    }

    #[test]
    fn test_create_requires_strictly_future_time() {
        let now = Utc::now();
        let admin = Email::parse("ops@example.org").unwrap();

        assert!(matches!(
            create_body(now).validate(now, &admin),
            Err(AppError::Validation(_))
        ));
        assert!(create_body(now - TimeDelta::minutes(1)).validate(now, &admin).is_err());

        let new = create_body(now + TimeDelta::minutes(1))
            .validate(now, &admin)
            .unwrap();
        assert_eq!(new.created_by, "ops@example.org");
    }

    #[test]
    fn test_update_checks_new_time_only_when_present() {
        let now = Utc::now();
        let body: UpdateScheduledActionRequest =
            serde_json::from_str(r#"{"payload": {"reason": "offboarding"}}"#).unwrap();
        let update = body.validate(now).unwrap();
        assert!(update.scheduled_for.is_none());
        assert!(update.payload.is_present());

        let body = UpdateScheduledActionRequest {
            scheduled_for: Patch::Value(now - TimeDelta::hours(1)),
            ..Default::default()
        };
        assert!(matches!(body.validate(now), Err(AppError::Validation(_))));
    }
}
