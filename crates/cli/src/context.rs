//! Application context - wires adapters, pipeline and health checker

use std::sync::Arc;

use anyhow::Context as _;
use auditbridge_core::{Clock, ForwardingPipeline, HealthChecker, SystemClock};
use auditbridge_domain::AppConfig;
use auditbridge_infra::{CrusoeAuditClient, HecClient, HecSettings, HttpClient, StaticTokenProvider};

/// Everything a command needs, built once from validated configuration.
pub struct AppContext {
    pub config: AppConfig,
    pub clock: Arc<dyn Clock>,
    pub pipeline: Arc<ForwardingPipeline>,
    pub health: HealthChecker,
}

impl AppContext {
    /// Validate `config` and build the source and sink adapters.
    ///
    /// No network activity happens here.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let timeout = config.forwarding.request_timeout();
        let source_http =
            HttpClient::builder().timeout(timeout).build().context("Failed to build source HTTP client")?;
        let sink_http = HttpClient::builder()
            .timeout(timeout)
            .verify_ssl(config.sink.verify_ssl)
            .build()
            .context("Failed to build sink HTTP client")?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let source = Arc::new(
            CrusoeAuditClient::from_config(
                source_http,
                &config.source,
                Arc::new(StaticTokenProvider::bearer(config.source.api_token.clone())),
            )
            .context("Invalid source configuration")?,
        );
        let sink = Arc::new(
            HecClient::new(
                sink_http,
                &config.sink.hec_url,
                HecSettings::from_config(&config.sink),
                Arc::new(StaticTokenProvider::splunk(config.sink.hec_token.clone())),
                Arc::clone(&clock),
            )
            .context("Invalid sink configuration")?,
        );

        let pipeline = Arc::new(ForwardingPipeline::from_config(source.clone(), sink.clone(), &config));
        let health = HealthChecker::new(source, sink, Arc::clone(&clock), config.source.organization_id.clone());

        tracing::debug!(
            org = %config.source.organization_id,
            batch_size = config.forwarding.batch_size,
            "Application context initialized"
        );

        Ok(Self { config, clock, pipeline, health })
    }
}
