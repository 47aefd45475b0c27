//! Session-related types for portal authentication.
//!
//! Types stored in the session for authentication state. An admin session and
//! an end-user session are mutually exclusive: logging in as one clears the
//! other.

use serde::{Deserialize, Serialize};

use mailroom_core::{AdminRole, AdminUserId, Email, UserId};

use super::{AdminUser, User};

/// Session-stored admin identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentAdmin {
    pub id: AdminUserId,
    pub email: Email,
    pub name: String,
    pub role: AdminRole,
}

impl From<&AdminUser> for CurrentAdmin {
    fn from(admin: &AdminUser) -> Self {
        Self {
            id: admin.id,
            email: admin.email.clone(),
            name: admin.name.clone(),
            role: admin.role,
        }
    }
}

/// Session-stored end-user identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

/// The authenticated admin making a request, reloaded per request from the
/// operator's row and passed explicitly into every administrative operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub admin_id: AdminUserId,
    pub email: Email,
    pub role: AdminRole,
    /// Client address as seen by the server, recorded on audit entries.
    pub ip: Option<String>,
}

impl Actor {
    #[must_use]
    pub fn from_admin(admin: &AdminUser, ip: Option<String>) -> Self {
        Self {
            admin_id: admin.id,
            email: admin.email.clone(),
            role: admin.role,
            ip,
        }
    }

    #[must_use]
    pub const fn is_super_admin(&self) -> bool {
        matches!(self.role, AdminRole::SuperAdmin)
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";

    /// Key for storing the logged-in end user.
    pub const CURRENT_USER: &str = "current_user";
}
