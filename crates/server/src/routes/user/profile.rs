//! Profile and password handlers for the logged-in user.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, put},
};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::db::UserRepository;
use crate::error::{ApiJson, AppError};
use crate::middleware::RequireUser;
use crate::models::User;
use crate::routes::found;
use crate::services::auth::{AuthError, hash_password, validate_password, verify_password};
use crate::services::lifecycle::UpdateProfileRequest;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/profile", get(show).put(update))
        .route("/user/password", put(change_password))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// GET /user/profile
#[instrument(skip(user, state), fields(user_id = %user.id))]
async fn show(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    let profile = UserRepository::new(state.pool()).get_by_id(user.id).await?;
    Ok(Json(found(profile, "User")?))
}

/// PUT /user/profile
#[instrument(skip(user, state, body), fields(user_id = %user.id))]
async fn update(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    let fields = body.changed_fields();
    let profile = UserRepository::new(state.pool())
        .update_profile(&user.email, body.into_update()?)
        .await?;

    info!(?fields, "Profile updated");
    Ok(Json(profile))
}

/// PUT /user/password
#[instrument(skip(user, state, body), fields(user_id = %user.id))]
async fn change_password(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    let users = UserRepository::new(state.pool());
    let (_, current_hash) = found(users.get_with_password_hash(&user.email).await?, "User")?;

    verify_password(&body.current_password, &current_hash).map_err(|e| match e {
        AuthError::InvalidCredentials => AppError::validation("current password is incorrect"),
        other => AppError::from(other),
    })?;
    validate_password(&body.new_password)?;

    let hash = hash_password(&body.new_password)?;
    users.set_password_hash(&user.email, &hash, false).await?;

    info!("Password changed");
    Ok(StatusCode::NO_CONTENT)
}
