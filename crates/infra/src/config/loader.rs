//! Configuration loader
//!
//! Loads application configuration from environment variables or a file.
//!
//! ## Loading Strategy
//! 1. A `.env` file in the working directory (or a parent) is applied to the
//!    process environment without overriding variables that are already set
//! 2. If a config file path is given, the file is loaded (JSON or TOML by
//!    extension)
//! 3. Otherwise the configuration is read from environment variables
//!
//! Loading never validates; call [`AppConfig::validate`] before using the
//! configuration so that `config-check` can still report what is missing.
//!
//! ## Environment Variables
//! - `CRUSOE_API_TOKEN`, `CRUSOE_BASE_URL`, `CRUSOE_ORG_ID`
//! - `SPLUNK_HEC_TOKEN`, `SPLUNK_HEC_URL`, `SPLUNK_INDEX`,
//!   `SPLUNK_SOURCETYPE`, `SPLUNK_SOURCE`, `SPLUNK_VERIFY_SSL`
//! - `BATCH_SIZE`, `PAGE_SIZE`, `MAX_PAGES`, `REQUEST_TIMEOUT`,
//!   `MAX_RETRIES`, `OVERLAP_SECONDS`

use std::path::{Path, PathBuf};
use std::str::FromStr;

use auditbridge_domain::{AppConfig, ForwarderError, ForwardingConfig, Result, SinkConfig, SourceConfig};

/// Load configuration from `path` if given, from the environment otherwise.
///
/// # Errors
/// Returns `ForwarderError::Configuration` if the file cannot be read or
/// parsed, or an environment variable has an invalid value.
pub fn load(path: Option<&Path>) -> Result<AppConfig> {
    if let Some(dotenv) = load_dotenv() {
        tracing::debug!(path = %dotenv.display(), "Applied .env file");
    }

    match path {
        Some(path) => load_from_file(path),
        None => {
            let config = load_from_env()?;
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
    }
}

/// Apply the nearest `.env` file, returning its path when one was found.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// Load configuration from process environment variables.
///
/// # Errors
/// Returns `ForwarderError::Configuration` if a numeric or boolean variable
/// cannot be parsed.
pub fn load_from_env() -> Result<AppConfig> {
    load_from_lookup(|key| std::env::var(key).ok())
}

/// Build configuration from an arbitrary variable lookup.
///
/// Unset and empty variables fall back to defaults; required values are left
/// empty for [`AppConfig::validate`] to report.
pub fn load_from_lookup<F>(lookup: F) -> Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let defaults = AppConfig::default();

    let source = SourceConfig {
        api_token: var("CRUSOE_API_TOKEN").unwrap_or_default(),
        base_url: var("CRUSOE_BASE_URL").unwrap_or(defaults.source.base_url),
        organization_id: var("CRUSOE_ORG_ID").unwrap_or_default(),
        page_size: parse_or(&var, "PAGE_SIZE", defaults.source.page_size)?,
        max_pages: var("MAX_PAGES").map(|raw| parse_value("MAX_PAGES", &raw)).transpose()?,
    };

    let sink = SinkConfig {
        hec_token: var("SPLUNK_HEC_TOKEN").unwrap_or_default(),
        hec_url: var("SPLUNK_HEC_URL").unwrap_or_default(),
        index: var("SPLUNK_INDEX"),
        sourcetype: var("SPLUNK_SOURCETYPE").unwrap_or(defaults.sink.sourcetype),
        source: var("SPLUNK_SOURCE").unwrap_or(defaults.sink.source),
        verify_ssl: match var("SPLUNK_VERIFY_SSL") {
            Some(raw) => parse_bool("SPLUNK_VERIFY_SSL", &raw)?,
            None => defaults.sink.verify_ssl,
        },
    };

    let forwarding = ForwardingConfig {
        batch_size: parse_or(&var, "BATCH_SIZE", defaults.forwarding.batch_size)?,
        request_timeout_secs: parse_or(&var, "REQUEST_TIMEOUT", defaults.forwarding.request_timeout_secs)?,
        max_retries: parse_or(&var, "MAX_RETRIES", defaults.forwarding.max_retries)?,
        overlap_secs: parse_or(&var, "OVERLAP_SECONDS", defaults.forwarding.overlap_secs)?,
        ..defaults.forwarding
    };

    Ok(AppConfig { source, sink, forwarding })
}

/// Load configuration from a file.
///
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `ForwarderError::Configuration` if:
/// - File not found
/// - File format is invalid or unsupported
pub fn load_from_file(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Err(ForwarderError::Configuration(format!("Config file not found: {}", path.display())));
    }

    tracing::info!(path = %path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| ForwarderError::Configuration(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<AppConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ForwarderError::Configuration(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ForwarderError::Configuration(format!("Invalid JSON format: {e}"))),
        _ => Err(ForwarderError::Configuration(format!("Unsupported config format: {extension}"))),
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    var(key).map_or(Ok(default), |raw| parse_value(key, &raw))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e| ForwarderError::Configuration(format!("Invalid value for {key} ({raw:?}): {e}")))
}

/// Parse a boolean flag
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ForwarderError::Configuration(format!("Invalid boolean for {key}: {raw:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::Builder;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_all_variables_are_read() {
        let config = load_from_lookup(lookup(&[
            ("CRUSOE_API_TOKEN", "api"),
            ("CRUSOE_BASE_URL", "https://source.example/v2"),
            ("CRUSOE_ORG_ID", "org-7"),
            ("SPLUNK_HEC_TOKEN", "hec"),
            ("SPLUNK_HEC_URL", "https://splunk.example:8088/services/collector/event"),
            ("SPLUNK_INDEX", "audit"),
            ("SPLUNK_SOURCETYPE", "custom:audit"),
            ("SPLUNK_SOURCE", "custom"),
            ("SPLUNK_VERIFY_SSL", "off"),
            ("BATCH_SIZE", "50"),
            ("PAGE_SIZE", "200"),
            ("MAX_PAGES", "10"),
            ("REQUEST_TIMEOUT", "5"),
            ("MAX_RETRIES", "2"),
            ("OVERLAP_SECONDS", "60"),
        ]))
        .unwrap();

        assert_eq!(config.source.api_token, "api");
        assert_eq!(config.source.base_url, "https://source.example/v2");
        assert_eq!(config.source.organization_id, "org-7");
        assert_eq!(config.source.page_size, 200);
        assert_eq!(config.source.max_pages, Some(10));
        assert_eq!(config.sink.index.as_deref(), Some("audit"));
        assert_eq!(config.sink.sourcetype, "custom:audit");
        assert_eq!(config.sink.source, "custom");
        assert!(!config.sink.verify_ssl);
        assert_eq!(config.forwarding.batch_size, 50);
        assert_eq!(config.forwarding.request_timeout_secs, 5);
        assert_eq!(config.forwarding.max_retries, 2);
        assert_eq!(config.forwarding.overlap_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unset_variables_use_defaults() {
        let config = load_from_lookup(lookup(&[("SPLUNK_INDEX", "")])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = load_from_lookup(lookup(&[("BATCH_SIZE", "lots")])).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("BATCH_SIZE"));
    }

    #[test]
    fn test_invalid_boolean_is_rejected() {
        let err = load_from_lookup(lookup(&[("SPLUNK_VERIFY_SSL", "maybe")])).unwrap_err();
        assert!(err.to_string().contains("SPLUNK_VERIFY_SSL"));
    }

    #[test]
    fn test_load_from_process_env() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("CRUSOE_ORG_ID", "org-from-env");
        std::env::set_var("MAX_RETRIES", "7");

        let config = load_from_env().unwrap();
        assert_eq!(config.source.organization_id, "org-from-env");
        assert_eq!(config.forwarding.max_retries, 7);

        std::env::remove_var("CRUSOE_ORG_ID");
        std::env::remove_var("MAX_RETRIES");
    }

    #[test]
    fn test_load_from_file_toml() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[source]
api_token = "api"
organization_id = "org-1"

[sink]
hec_token = "hec"
hec_url = "https://splunk:8088/services/collector/event"

[forwarding]
batch_size = 25
"#
        )
        .unwrap();

        let config = load_from_file(file.path()).unwrap();
        assert_eq!(config.forwarding.batch_size, 25);
        assert_eq!(config.forwarding.max_retries, 3);
        assert_eq!(config.source.base_url, "https://api.crusoecloud.com/v1alpha5");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unsupported_extension_is_rejected() {
        let file = Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Unsupported config format"));
    }

    #[test]
    fn test_missing_file_is_rejected() {
        let err = load_from_file(Path::new("/nonexistent/auditbridge.toml")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
