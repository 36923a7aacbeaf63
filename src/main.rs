//! PasteMark - paste clipboard images into Markdown documents
//!
//! This is the main entry point for the `pastemark` command.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pastemark::cli::{Cli, CliHandler};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let handler = CliHandler::new(cli.config)?;

    // Initialize logging; stdout is reserved for command output
    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        handler.config().log_level.clone()
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("pastemark={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    debug!("PasteMark v{}", pastemark::VERSION);

    handler.handle_command(cli.command).await
}
