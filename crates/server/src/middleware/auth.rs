//! Authentication extractors and session helpers.
//!
//! The caller's identity is resolved per request from the session and handed
//! to handlers as an explicit value. Admin and end-user sessions are mutually
//! exclusive. The session only names the account; its current state is
//! reloaded on every request, so suspension, deactivation, demotion and
//! deletion take effect immediately.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRef, FromRequestParts},
    http::request::Parts,
};
use chrono::Utc;
use tower_sessions::Session;

use crate::db::{AdminUserRepository, UserRepository};
use crate::error::{AppError, set_sentry_user};
use crate::middleware::rate_limit::client_ip;
use crate::models::{Actor, CurrentAdmin, CurrentUser, session_keys};
use crate::state::AppState;

const LOGIN_REQUIRED: &str = "authentication required";

fn session_error(err: tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session error: {err}"))
}

fn session_from_parts(parts: &Parts) -> Result<&Session, AppError> {
    parts
        .extensions
        .get::<Session>()
        .ok_or_else(|| AppError::Internal("session layer missing".to_owned()))
}

/// Client address for audit entries: proxy headers, then the peer address.
fn request_ip(parts: &Parts) -> Option<String> {
    client_ip(&parts.headers)
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
        .map(|ip| ip.to_string())
}

async fn current_admin(session: &Session) -> Result<Option<CurrentAdmin>, AppError> {
    session
        .get::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await
        .map_err(session_error)
}

async fn current_user(session: &Session) -> Result<Option<CurrentUser>, AppError> {
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .map_err(session_error)
}

/// Extractor that requires an admin session.
///
/// Rejects with 401 when nobody is logged in, and with 403 when the session
/// belongs to an end user or the operator has since been deactivated or
/// deleted. The role comes from the database, not the session.
///
/// ```rust,ignore
/// async fn handler(RequireAdmin(actor): RequireAdmin) -> String {
///     format!("Hello, {}!", actor.email)
/// }
/// ```
pub struct RequireAdmin(pub Actor);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts)?;

        let Some(admin) = current_admin(session).await? else {
            if current_user(session).await?.is_some() {
                return Err(AppError::Forbidden("admin access required".to_owned()));
            }
            return Err(AppError::Unauthorized(LOGIN_REQUIRED.to_owned()));
        };

        let state = AppState::from_ref(state);
        let record = AdminUserRepository::new(state.pool())
            .get_by_id(admin.id)
            .await?
            .filter(|record| record.is_active)
            .ok_or_else(|| AppError::Forbidden("admin account is disabled".to_owned()))?;

        set_sentry_user(record.id.as_i32(), record.email.as_str());
        Ok(Self(Actor::from_admin(&record, request_ip(parts))))
    }
}

/// Extractor that requires a super admin session.
pub struct RequireSuperAdmin(pub Actor);

impl<S> FromRequestParts<S> for RequireSuperAdmin
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAdmin(actor) = RequireAdmin::from_request_parts(parts, state).await?;
        if !actor.is_super_admin() {
            return Err(AppError::Forbidden("super admin access required".to_owned()));
        }
        Ok(Self(actor))
    }
}

/// Extractor that requires an end-user session.
///
/// Rejects with 401 when nobody is logged in or the account no longer exists
/// (the stale session is flushed), and with 403 when the session belongs to
/// an admin or the account is suspended or locked.
pub struct RequireUser(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts)?;

        let Some(current) = current_user(session).await? else {
            if current_admin(session).await?.is_some() {
                return Err(AppError::Forbidden("end-user session required".to_owned()));
            }
            return Err(AppError::Unauthorized(LOGIN_REQUIRED.to_owned()));
        };

        let state = AppState::from_ref(state);
        let Some(user) = UserRepository::new(state.pool())
            .get_by_id(current.id)
            .await?
        else {
            end_session(session).await?;
            return Err(AppError::Unauthorized(LOGIN_REQUIRED.to_owned()));
        };

        if user.is_suspended {
            return Err(AppError::Forbidden("account is suspended".to_owned()));
        }
        if user.is_locked_at(Utc::now()) {
            return Err(AppError::Forbidden("account is locked".to_owned()));
        }

        Ok(Self(CurrentUser::from(&user)))
    }
}

/// Whoever is logged in, if anyone.
pub enum SessionIdentity {
    Admin(CurrentAdmin),
    User(CurrentUser),
}

/// Extractor that reads the session without rejecting anonymous callers.
pub struct OptionalIdentity(pub Option<SessionIdentity>);

impl<S> FromRequestParts<S> for OptionalIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts)?;
        if let Some(admin) = current_admin(session).await? {
            return Ok(Self(Some(SessionIdentity::Admin(admin))));
        }
        Ok(Self(current_user(session).await?.map(SessionIdentity::User)))
    }
}

// =============================================================================
// Session helpers
// =============================================================================

/// Start an admin session, replacing any previous identity.
///
/// # Errors
///
/// Returns `AppError::Internal` if the session store fails.
pub async fn start_admin_session(session: &Session, admin: &CurrentAdmin) -> Result<(), AppError> {
    session.cycle_id().await.map_err(session_error)?;
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .map_err(session_error)?;
    session
        .insert(session_keys::CURRENT_ADMIN, admin)
        .await
        .map_err(session_error)
}

/// Start an end-user session, replacing any previous identity.
///
/// # Errors
///
/// Returns `AppError::Internal` if the session store fails.
pub async fn start_user_session(session: &Session, user: &CurrentUser) -> Result<(), AppError> {
    session.cycle_id().await.map_err(session_error)?;
    session
        .remove::<CurrentAdmin>(session_keys::CURRENT_ADMIN)
        .await
        .map_err(session_error)?;
    session
        .insert(session_keys::CURRENT_USER, user)
        .await
        .map_err(session_error)
}

/// End the session entirely.
///
/// # Errors
///
/// Returns `AppError::Internal` if the session store fails.
pub async fn end_session(session: &Session) -> Result<(), AppError> {
    session.flush().await.map_err(session_error)
}
