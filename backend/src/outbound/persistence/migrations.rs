//! Embedded schema migrations.

use diesel::{Connection, PgConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

/// Migrations compiled from `backend/migrations`.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Failures while bringing the schema up to date.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    #[error("failed to connect for migrations: {message}")]
    Connect { message: String },
    #[error("failed to apply migrations: {message}")]
    Apply { message: String },
}

/// Apply every pending migration on a dedicated blocking connection.
///
/// Returns the number of migrations applied.
///
/// # Errors
///
/// [`MigrationError`] when the database cannot be reached or a migration
/// fails.
pub async fn run_migrations(database_url: &str) -> Result<usize, MigrationError> {
    let url = database_url.to_owned();
    let applied = tokio::task::spawn_blocking(move || {
        let mut conn = PgConnection::establish(&url).map_err(|err| MigrationError::Connect {
            message: err.to_string(),
        })?;
        conn.run_pending_migrations(MIGRATIONS)
            .map(|versions| versions.len())
            .map_err(|err| MigrationError::Apply {
                message: err.to_string(),
            })
    })
    .await
    .map_err(|err| MigrationError::Apply {
        message: err.to_string(),
    })??;
    info!(applied, "database migrations complete");
    Ok(applied)
}
