//! `config-check`: display settings without revealing secrets

use std::process::ExitCode;

use auditbridge_domain::AppConfig;

pub fn execute(config: &AppConfig) -> ExitCode {
    for line in report(config) {
        println!("{line}");
    }

    match config.validate() {
        Ok(()) => {
            println!("Configuration is valid");
            ExitCode::SUCCESS
        }
        Err(err) => {
            println!("Configuration is invalid: {err}");
            ExitCode::FAILURE
        }
    }
}

fn report(config: &AppConfig) -> Vec<String> {
    let max_pages = config.source.max_pages.map_or_else(|| "unlimited".to_string(), |n| n.to_string());
    vec![
        "Configuration Check:".to_string(),
        format!("  Crusoe API URL: {}", config.source.base_url),
        format!("  Crusoe Org ID: {}", display_or(&config.source.organization_id, "Missing")),
        format!("  Crusoe API Token: {}", presence(&config.source.api_token)),
        format!("  Splunk HEC URL: {}", display_or(&config.sink.hec_url, "Missing")),
        format!("  Splunk HEC Token: {}", presence(&config.sink.hec_token)),
        format!("  Splunk Index: {}", config.sink.index.as_deref().unwrap_or("Default")),
        format!("  Splunk Sourcetype: {}", config.sink.sourcetype),
        format!("  Splunk Source: {}", config.sink.source),
        format!("  Verify TLS: {}", config.sink.verify_ssl),
        format!("  Batch Size: {}", config.forwarding.batch_size),
        format!("  Page Size: {}", config.source.page_size),
        format!("  Max Pages: {max_pages}"),
        format!("  Request Timeout: {}s", config.forwarding.request_timeout_secs),
        format!("  Max Retries: {}", config.forwarding.max_retries),
        format!("  Window Overlap: {}s", config.forwarding.overlap_secs),
    ]
}

fn presence(secret: &str) -> &'static str {
    if secret.trim().is_empty() {
        "Missing"
    } else {
        "Set"
    }
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}
