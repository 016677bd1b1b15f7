//! AuditBridge - audit-log forwarder
//!
//! Main entry point for the `auditbridge` binary.

mod cli;
mod commands;
mod context;
mod logging;

use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::context::AppContext;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Keep the guard alive so buffered file output is flushed on exit
    let _guard = match logging::init(cli.log_format, cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Failed to initialize logging: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "auditbridge failed");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let output = cli.output;
    let config = auditbridge_infra::config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // config-check reports problems instead of failing on them
    let ctx = match cli.command {
        Commands::ConfigCheck => return Ok(commands::config_check::execute(&config)),
        _ => AppContext::new(config)?,
    };

    match cli.command {
        Commands::ConfigCheck => Ok(commands::config_check::execute(&ctx.config)),
        Commands::Health => commands::health::execute(&ctx, output).await,
        Commands::ForwardRecent { hours, dry_run } => {
            commands::forward::recent(&ctx, hours, dry_run, output).await
        }
        Commands::ForwardRange { start_time, end_time, dry_run } => {
            commands::forward::range(&ctx, start_time, end_time, dry_run, output).await
        }
        Commands::Daemon(args) => commands::daemon::execute(ctx, args, output).await,
    }
}
