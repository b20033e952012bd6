//! CLI command definitions and dispatch.

pub mod folder;
pub mod migrate;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use folderhub_core::config::AppConfig;
use folderhub_core::error::AppError;
use folderhub_database::DatabasePool;

/// FolderHub: hierarchical album folders
#[derive(Debug, Parser)]
#[command(name = "folderhub", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Folder hierarchy management
    Folder(folder::FolderArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: &AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, config, self.format).await,
            Commands::Folder(args) => folder::execute(args, config, self.format).await,
        }
    }
}

/// Helper: create database pool from config
pub async fn create_db_pool(config: &AppConfig) -> Result<DatabasePool, AppError> {
    DatabasePool::connect(&config.database).await
}
