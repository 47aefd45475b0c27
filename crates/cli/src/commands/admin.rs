//! Console operator bootstrap.
//!
//! # Usage
//!
//! ```bash
//! MAILROOM_ADMIN_PASSWORD='...' mailroom-cli admin create -e ops@example.org -n "Ops" -r super_admin
//! ```
//!
//! The first super admin has to come from here; after that, super admins
//! manage operators through `/admin/admin-users`.

use mailroom_core::{AdminRole, Email};
use mailroom_server::db::admin_users::NewAdminUser;
use mailroom_server::db::{AdminUserRepository, RepositoryError};
use mailroom_server::services::auth::{AuthError, hash_password, validate_password};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

use super::database_url;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Missing environment variable: PORTAL_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid role: {0}. Valid roles: super_admin, admin")]
    InvalidRole(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid password: {0}")]
    Password(#[from] AuthError),

    #[error("Admin user already exists with email: {0}")]
    UserExists(String),

    #[error("{0}")]
    Repository(RepositoryError),
}

/// Create a console operator with a local password.
///
/// # Returns
///
/// The ID of the created admin user.
///
/// # Errors
///
/// Returns an error for a bad role, email or password, a missing database
/// URL, or an existing operator with the same email.
pub async fn create_user(
    email: &str,
    name: &str,
    role: &str,
    password: &str,
) -> Result<i32, AdminError> {
    dotenvy::dotenv().ok();

    let role: AdminRole = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;
    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    validate_password(password)?;

    let url = database_url().ok_or(AdminError::MissingDatabaseUrl)?;

    tracing::info!("Connecting to portal database...");
    let pool = PgPool::connect(url.expose_secret()).await?;

    tracing::info!("Creating admin user: {} ({})", email, role);
    let new = NewAdminUser {
        email: email.clone(),
        name: name.trim().to_owned(),
        role,
        password_hash: hash_password(password)?,
        created_by: None,
    };

    let admin = AdminUserRepository::new(&pool)
        .create(&new)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AdminError::UserExists(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}, Role: {}",
        admin.id,
        admin.email,
        admin.role
    );

    Ok(admin.id.as_i32())
}
