//! `daemon`: forward overlapping windows until interrupted

use std::future::Future;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context as _;
use auditbridge_infra::{ForwardScheduler, ForwardSchedulerConfig};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cli::{DaemonArgs, OutputFormat};
use crate::context::AppContext;

pub async fn execute(ctx: AppContext, args: DaemonArgs, output: OutputFormat) -> anyhow::Result<ExitCode> {
    let config = scheduler_config(&args, ctx.config.forwarding.overlap_secs);
    tracing::info!(
        interval_secs = args.interval,
        lookback_hours = args.hours,
        overlap_secs = config.overlap.as_secs(),
        dry_run = args.dry_run,
        "Starting daemon mode"
    );

    let scheduler = ForwardScheduler::new(ctx.pipeline, ctx.clock, config).context("Invalid daemon settings")?;

    let listener = cancel_on(scheduler.cancellation_token(), shutdown_signal());
    let summary = scheduler.run().await;
    listener.abort();
    let summary = summary.context("Daemon halted")?;

    if output == OutputFormat::Json {
        super::print_json(&summary)?;
        return Ok(ExitCode::SUCCESS);
    }
    println!("Daemon stopped after {} tick(s)", summary.ticks);
    println!(
        "  runs: {} succeeded, {} failed, {} skipped",
        summary.runs_succeeded, summary.runs_failed, summary.ticks_skipped
    );
    println!(
        "  records: {} fetched, {} delivered",
        summary.records_fetched, summary.records_delivered
    );
    if summary.runs_truncated > 0 {
        println!("  truncated windows: {}", summary.runs_truncated);
    }
    Ok(ExitCode::SUCCESS)
}

/// Cancel `token` once `signal` resolves.
fn cancel_on<F>(token: CancellationToken, signal: F) -> JoinHandle<()>
where
    F: Future<Output = &'static str> + Send + 'static,
{
    tokio::spawn(async move {
        let name = signal.await;
        tracing::info!(signal = name, "Shutdown requested, stopping after the current tick");
        token.cancel();
    })
}

/// Resolves on SIGINT, or SIGTERM on unix, with the signal's name.
async fn shutdown_signal() -> &'static str {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => "SIGINT",
        () = terminate => "SIGTERM",
    }
}

fn scheduler_config(args: &DaemonArgs, default_overlap_secs: u64) -> ForwardSchedulerConfig {
    ForwardSchedulerConfig {
        interval: Duration::from_secs(args.interval),
        lookback: Duration::from_secs(u64::from(args.hours) * 3600),
        overlap: Duration::from_secs(args.overlap.unwrap_or(default_overlap_secs)),
        dry_run: args.dry_run,
        ..ForwardSchedulerConfig::default()
    }
}
