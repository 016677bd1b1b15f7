//! `health`: check the source API and the sink

use std::process::ExitCode;

use crate::cli::OutputFormat;
use crate::context::AppContext;

pub async fn execute(ctx: &AppContext, output: OutputFormat) -> anyhow::Result<ExitCode> {
    let report = ctx.health.check().await;
    let code = if report.is_healthy() { ExitCode::SUCCESS } else { ExitCode::FAILURE };

    if output == OutputFormat::Json {
        super::print_json(&report)?;
        return Ok(code);
    }

    for component in [&report.source, &report.sink] {
        match &component.detail {
            Some(detail) if !component.healthy => println!("  {}: unhealthy ({detail})", component.name),
            _ => println!("  {}: {}", component.name, if component.healthy { "healthy" } else { "unhealthy" }),
        }
    }

    if report.is_healthy() {
        println!("All services are healthy");
    } else {
        println!("One or more services are unhealthy");
    }
    Ok(code)
}
