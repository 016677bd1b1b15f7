//! `forward-recent` and `forward-range`: one forwarding pass

use std::process::ExitCode;

use anyhow::Context as _;
use auditbridge_domain::{RunResult, TimeWindow};
use chrono::{DateTime, Duration, Utc};

use crate::cli::OutputFormat;
use crate::context::AppContext;

/// Forward the last `hours` hours.
pub async fn recent(
    ctx: &AppContext,
    hours: u32,
    dry_run: bool,
    output: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let window = recent_window(ctx.clock.now(), hours)?;
    tracing::info!(%window, hours, "Forwarding recent audit logs");
    forward(ctx, window, dry_run, output).await
}

/// Forward `[start, end)`; `end` defaults to now and `start` to one hour
/// before `end`.
pub async fn range(
    ctx: &AppContext,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    dry_run: bool,
    output: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let window = resolve_range(start, end, ctx.clock.now())?;
    tracing::info!(%window, "Forwarding audit logs for time range");
    forward(ctx, window, dry_run, output).await
}

fn recent_window(now: DateTime<Utc>, hours: u32) -> anyhow::Result<TimeWindow> {
    let lookback = Duration::try_hours(i64::from(hours))
        .with_context(|| format!("Invalid lookback of {hours} hour(s): duration out of range"))?;
    TimeWindow::ending_at(now, lookback).with_context(|| format!("Invalid lookback of {hours} hour(s)"))
}

fn resolve_range(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> anyhow::Result<TimeWindow> {
    let end = end.unwrap_or(now);
    let start = match start {
        Some(start) => start,
        None => end
            .checked_sub_signed(Duration::hours(1))
            .context("Range end is too early to default the start")?,
    };
    TimeWindow::new(start, end).context("Invalid time range")
}

async fn forward(
    ctx: &AppContext,
    window: TimeWindow,
    dry_run: bool,
    output: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let result = ctx.pipeline.run(window, dry_run).await?;
    match output {
        OutputFormat::Text => print_summary(&result),
        OutputFormat::Json => super::print_json(&result)?,
    }
    Ok(if result.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn print_summary(result: &RunResult) {
    for line in summary_lines(result) {
        println!("{line}");
    }
}

fn summary_lines(result: &RunResult) -> Vec<String> {
    let mut lines = vec![format!("Window: {}", result.window)];

    if let Some(cause) = &result.fetch_failure {
        lines.push(format!("Fetch failed: {cause}"));
        return lines;
    }

    lines.push(format!(
        "Fetched {} record(s), skipped {} malformed",
        result.records_fetched, result.records_skipped
    ));
    if result.truncated {
        lines.push("Warning: page limit reached before the last page, window is incomplete".to_string());
    }
    if result.dry_run {
        lines.push(format!(
            "Dry run: {} batch(es) planned, nothing sent to Splunk",
            result.batches_planned
        ));
    } else {
        lines.push(format!(
            "Delivered {} record(s) in {}/{} batch(es)",
            result.records_delivered, result.batches_succeeded, result.batches_attempted
        ));
        lines.extend(result.failures.iter().map(|failure| format!("  failed {failure}")));
    }
    lines
}
