//! Database migration management commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use folderhub_core::config::AppConfig;
use folderhub_core::error::AppError;
use folderhub_database::migration;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Run all pending migrations
    Run,
    /// Show applied migrations
    Status,
}

#[derive(Debug, Serialize, Tabled)]
struct MigrationRow {
    version: i64,
    description: String,
    installed_on: String,
    success: bool,
}

/// Execute migration commands
pub async fn execute(
    args: &MigrateArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let db = super::create_db_pool(config).await?;

    match &args.command {
        MigrateCommand::Run => {
            migration::run_migrations(db.pool()).await?;
            output::print_success("All migrations applied successfully.");
        }
        MigrateCommand::Status => {
            let rows: Vec<MigrationRow> = migration::applied_migrations(db.pool())
                .await?
                .into_iter()
                .map(|m| MigrationRow {
                    version: m.version,
                    description: m.description,
                    installed_on: m.installed_on.format("%Y-%m-%d %H:%M").to_string(),
                    success: m.success,
                })
                .collect();
            output::print_list(&rows, format);
        }
    }

    db.close().await;
    Ok(())
}
