//! CLI subcommand implementations.

pub mod admin;
pub mod migrate;

/// Read the portal database URL, falling back to `DATABASE_URL`.
pub(crate) fn database_url() -> Option<secrecy::SecretString> {
    std::env::var("PORTAL_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(secrecy::SecretString::from)
}
