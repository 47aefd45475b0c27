//! HTTP route handlers for the portal.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness
//! GET  /health/ready                        - Readiness (database ping)
//!
//! # Auth
//! POST /auth/admin-login                    - Admin login (rate limited)
//! POST /auth/admin-logout                   - Admin logout
//! POST /auth/login                          - End-user login (rate limited)
//! POST /auth/logout                         - End-user logout
//! GET  /auth/me                             - Current session identity
//!
//! # Admin console (admin session)
//! GET  /admin/dashboard
//! /admin/users, /admin/sending-limits, /admin/audit-logs, /admin/domains,
//! /admin/aliases, /admin/groups, /admin/templates, /admin/announcements,
//! /admin/scheduled-actions, /admin/support/tickets, /admin/admin-users
//!
//! # End-user dashboard (user session)
//! GET/PUT /user/profile, PUT /user/password, GET /user/mailbox-info,
//! GET/POST /user/support/tickets, GET /user/announcements
//! ```

pub mod admin;
pub mod auth;
pub mod user;

use axum::{Router, body::Bytes};
use serde::{Deserialize, de::DeserializeOwned};

use crate::error::AppError;
use crate::state::AppState;

/// Build the complete API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(admin::router())
        .merge(user::router())
}

// =============================================================================
// Shared helpers
// =============================================================================

/// `?search=` query parameter.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

/// Parse a JSON body that may be omitted entirely.
///
/// # Errors
///
/// Returns `AppError::Validation` if a non-empty body is not valid JSON for `T`.
pub fn optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::validation(format!("invalid JSON body: {e}")))
}

/// Turn a missing row into a 404 naming the resource.
///
/// # Errors
///
/// Returns `AppError::NotFound` when `row` is `None`.
pub fn found<T>(row: Option<T>, resource: &str) -> Result<T, AppError> {
    row.ok_or_else(|| AppError::NotFound(resource.to_owned()))
}

/// Trimmed value of a required text field.
///
/// # Errors
///
/// Returns `AppError::Validation` if the value is blank.
pub fn required_text(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_owned())
}

/// Like [`required_text`] for an optional update field.
///
/// # Errors
///
/// Returns `AppError::Validation` if the value is present but blank.
pub fn optional_text(field: &str, value: Option<String>) -> Result<Option<String>, AppError> {
    value.map(|v| required_text(field, &v)).transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Reason {
        reason: Option<String>,
    }

    #[test]
    fn test_optional_json_accepts_empty_body() {
        let parsed: Reason = optional_json(&Bytes::new()).unwrap();
        assert_eq!(parsed, Reason::default());

        let parsed: Reason = optional_json(&Bytes::from_static(b"  \n")).unwrap();
        assert_eq!(parsed, Reason::default());
    }

    #[test]
    fn test_optional_json_parses_body() {
        let parsed: Reason = optional_json(&Bytes::from_static(br#"{"reason":"spam"}"#)).unwrap();
        assert_eq!(parsed.reason.as_deref(), Some("spam"));
    }

    #[test]
    fn test_optional_json_rejects_garbage() {
        let err = optional_json::<Reason>(&Bytes::from_static(b"{not json")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_required_text() {
        assert_eq!(required_text("name", "  mail  ").unwrap(), "mail");
        assert!(matches!(
            required_text("name", "   "),
            Err(AppError::Validation(msg)) if msg == "name is required"
        ));
        assert_eq!(optional_text("name", None).unwrap(), None);
        assert!(optional_text("name", Some(String::new())).is_err());
    }
}
