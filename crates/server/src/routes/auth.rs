//! Authentication route handlers.
//!
//! Admins and end users log in with email and password. A successful login
//! cycles the session id and replaces whatever identity the session held.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware::map_response,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{info, instrument};

use mailroom_core::{AdminRole, AdminUserId, Email, UserId};

use crate::error::{ApiJson, AppError, clear_sentry_user};
use crate::middleware::auth::{end_session, start_admin_session, start_user_session};
use crate::middleware::{OptionalIdentity, SessionIdentity, auth_rate_limiter, json_rate_limit_body};
use crate::models::{AdminUser, CurrentAdmin, CurrentUser, User};
use crate::services::AuthService;
use crate::state::AppState;

/// Build the auth router. Login endpoints are rate limited per client IP.
pub fn router() -> Router<AppState> {
    let login = Router::new()
        .route("/auth/admin-login", post(admin_login))
        .route("/auth/login", post(user_login))
        .layer(auth_rate_limiter())
        .layer(map_response(json_rate_limit_body));

    Router::new()
        .merge(login)
        .route("/auth/admin-logout", post(logout))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Serialize)]
pub struct AdminSummary {
    pub id: AdminUserId,
    pub email: Email,
    pub name: String,
    pub role: AdminRole,
}

impl From<&AdminUser> for AdminSummary {
    fn from(admin: &AdminUser) -> Self {
        Self {
            id: admin.id,
            email: admin.email.clone(),
            name: admin.name.clone(),
            role: admin.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// Response of `GET /auth/me`.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeResponse {
    Admin(CurrentAdmin),
    User(CurrentUser),
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /auth/admin-login
#[instrument(skip(state, session, body), fields(email = %body.email))]
async fn admin_login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<AdminSummary>, AppError> {
    let auth = AuthService::new(state.pool(), &state.config().lockout);
    let admin = auth.login_admin(&body.email, &body.password).await?;

    start_admin_session(&session, &CurrentAdmin::from(&admin)).await?;
    info!(admin_id = %admin.id, "Admin logged in");

    Ok(Json(AdminSummary::from(&admin)))
}

/// POST /auth/login
#[instrument(skip(state, session, body), fields(email = %body.email))]
async fn user_login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<UserSummary>, AppError> {
    let auth = AuthService::new(state.pool(), &state.config().lockout);
    let user = auth.login_user(&body.email, &body.password).await?;

    start_user_session(&session, &CurrentUser::from(&user)).await?;
    info!(user_id = %user.id, "User logged in");

    Ok(Json(UserSummary::from(&user)))
}

/// POST /auth/logout and /auth/admin-logout
async fn logout(session: Session) -> Result<StatusCode, AppError> {
    end_session(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me
async fn me(OptionalIdentity(identity): OptionalIdentity) -> Result<Json<MeResponse>, AppError> {
    match identity {
        Some(SessionIdentity::Admin(admin)) => Ok(Json(MeResponse::Admin(admin))),
        Some(SessionIdentity::User(user)) => Ok(Json(MeResponse::User(user))),
        None => Err(AppError::Unauthorized("authentication required".to_owned())),
    }
}
