//! FolderHub CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use folderhub_core::config::{AppConfig, LoggingConfig};

mod commands;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    init_logging(&config.logging);

    if let Err(e) = cli.execute(&config).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the
/// configured level.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.format == "json" {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
}
