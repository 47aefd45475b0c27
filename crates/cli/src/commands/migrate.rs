//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! mailroom-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `PORTAL_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! Migrations live in `crates/server/migrations/` and are embedded at build
//! time. The server never runs them on startup.

use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

use super::database_url;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: PORTAL_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply every pending portal migration.
///
/// # Errors
///
/// Returns an error if the URL is missing, the connection fails, or a
/// migration fails to apply.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let url = database_url().ok_or(MigrationError::MissingDatabaseUrl)?;

    tracing::info!("Connecting to portal database...");
    let pool = PgPool::connect(url.expose_secret()).await?;

    tracing::info!("Running portal migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Portal migrations complete");
    Ok(())
}
