//! Command implementations

pub mod config_check;
pub mod daemon;
pub mod forward;
pub mod health;

use anyhow::Context as _;
use serde::Serialize;

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render JSON output")?;
    println!("{rendered}");
    Ok(())
}
