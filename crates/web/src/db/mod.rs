//! Snippet and user stores.
//!
//! Handlers never talk to `PostgreSQL` directly: they go through the
//! [`SnippetStore`] and [`UserStore`] traits held by `AppState`. Production
//! wires in the sqlx implementations below; tests use [`memory`].
//!
//! # Tables
//!
//! - `snippets` - Snippet text and its expiry
//! - `users` - Accounts (unique email, argon2 password hash)
//! - `tower_sessions.session` - Session records (managed by tower-sessions)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/web/migrations/` and run at startup by
//! [`run_migrations`].

pub mod memory;
pub mod snippets;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use snippetbox_core::{Email, SnippetId, SnippetLifetime, UserId};

use crate::models::Snippet;

pub use snippets::PgSnippetStore;
pub use users::PgUserStore;

/// Number of snippets shown on the home page.
pub const LATEST_LIMIT: usize = 10;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found (or has expired).
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Stored credentials for a user, as needed to verify a login.
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    /// The user's ID.
    pub id: UserId,
    /// PHC-format argon2 hash.
    pub password_hash: String,
}

/// Snippet persistence.
#[async_trait]
pub trait SnippetStore: Send + Sync {
    /// Insert a snippet that expires `lifetime` after now.
    async fn insert(
        &self,
        title: &str,
        content: &str,
        lifetime: SnippetLifetime,
    ) -> Result<SnippetId, RepositoryError>;

    /// Fetch a snippet. Expired snippets are reported as
    /// [`RepositoryError::NotFound`].
    async fn get(&self, id: SnippetId) -> Result<Snippet, RepositoryError>;

    /// The [`LATEST_LIMIT`] most recently created unexpired snippets, newest first.
    async fn latest(&self) -> Result<Vec<Snippet>, RepositoryError>;
}

/// User persistence.
///
/// Password hashing lives in `AuthService`; the store only sees hashes.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. A taken email is reported as [`RepositoryError::Conflict`].
    async fn insert(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<UserId, RepositoryError>;

    /// Look up the credentials registered for an email.
    async fn credentials(&self, email: &Email)
    -> Result<Option<StoredCredentials>, RepositoryError>;

    /// Whether a user with this ID exists.
    async fn exists(&self, id: UserId) -> Result<bool, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply the schema migrations in `crates/web/migrations`.
///
/// # Errors
///
/// Returns `RepositoryError::Migration` if a migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> Result<(), RepositoryError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
fn conflict_or_database(err: sqlx::Error, conflict: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(conflict.to_owned());
    }
    RepositoryError::Database(err)
}
