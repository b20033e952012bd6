//! Database migration runner.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::info;

use folderhub_core::error::{AppError, ErrorKind};

/// Run all pending database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    info!("Running database migrations...");

    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to run migrations: {e}"),
                e,
            )
        })?;

    info!("Database migrations completed successfully");
    Ok(())
}

/// One applied migration as recorded by sqlx.
#[derive(Debug, Clone, FromRow)]
pub struct AppliedMigration {
    /// Migration version (timestamp prefix of the file name).
    pub version: i64,
    /// Migration description.
    pub description: String,
    /// When the migration was applied.
    pub installed_on: DateTime<Utc>,
    /// Whether the migration completed.
    pub success: bool,
}

/// List applied migrations, oldest first.
pub async fn applied_migrations(pool: &PgPool) -> Result<Vec<AppliedMigration>, AppError> {
    sqlx::query_as::<_, AppliedMigration>(
        "SELECT version, description, installed_on, success FROM _sqlx_migrations ORDER BY version",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| {
        AppError::with_source(ErrorKind::Database, "Failed to read migration history", e)
    })
}
