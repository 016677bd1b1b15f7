//! Command-line arguments

use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format of the log stream on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Format of command results on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Forward audit logs from the Crusoe API to a Splunk HTTP Event Collector.
#[derive(Debug, Parser)]
#[command(name = "auditbridge", version, about = "Crusoe audit-log to Splunk HEC forwarder")]
pub struct Cli {
    /// JSON or TOML configuration file (environment variables are used when omitted)
    #[arg(long, global = true, env = "AUDITBRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Result format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    pub output: OutputFormat,

    /// Log format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    pub log_format: LogFormat,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Validate configuration and display current settings
    ConfigCheck,

    /// Check reachability of the Crusoe API and the Splunk HEC endpoint
    Health,

    /// Forward audit logs from the last N hours
    ForwardRecent {
        /// Number of hours back to fetch logs
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        hours: u32,
        /// Fetch and batch logs without sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Forward audit logs for a specific time range
    ForwardRange {
        /// Start time (e.g. 2024-01-01T00:00:00Z); defaults to one hour before the end
        #[arg(long, value_parser = parse_timestamp)]
        start_time: Option<DateTime<Utc>>,
        /// End time (e.g. 2024-01-01T23:59:59Z); defaults to now
        #[arg(long, value_parser = parse_timestamp)]
        end_time: Option<DateTime<Utc>>,
        /// Fetch and batch logs without sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// Run continuously, forwarding overlapping windows on an interval
    Daemon(DaemonArgs),
}

#[derive(Debug, Clone, Args)]
pub struct DaemonArgs {
    /// Seconds between runs
    #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,
    /// Hours back to fetch on the first run
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub hours: u32,
    /// Seconds each window reaches back before the previous window's end
    /// (defaults to OVERLAP_SECONDS from the configuration)
    #[arg(long)]
    pub overlap: Option<u64>,
    /// Fetch and batch logs without sending them
    #[arg(long)]
    pub dry_run: bool,
}

/// Parse an RFC 3339 timestamp, or a timestamp without offset taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid timestamp `{raw}`, expected ISO 8601 such as 2024-01-01T00:00:00Z"))
}
