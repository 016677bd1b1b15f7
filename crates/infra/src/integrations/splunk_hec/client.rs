//! Sink adapter for the HTTP Event Collector

use std::sync::Arc;

use async_trait::async_trait;
use auditbridge_core::{Clock, EventSink};
use auditbridge_domain::constants::HEC_HEALTH_PATH;
use auditbridge_domain::{ApiError, Batch};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use tracing::{debug, instrument};
use url::Url;

use super::envelope::{encode_batch, HecSettings};
use crate::auth::CredentialProvider;
use crate::http::HttpClient;

/// Posts batches to the collector endpoint as newline-delimited envelopes.
pub struct HecClient {
    http: HttpClient,
    event_url: Url,
    health_url: Url,
    settings: HecSettings,
    auth: Arc<dyn CredentialProvider>,
    clock: Arc<dyn Clock>,
}

impl HecClient {
    /// # Errors
    /// Returns `ApiError::Config` if `hec_url` is not an absolute URL.
    pub fn new(
        http: HttpClient,
        hec_url: &str,
        settings: HecSettings,
        auth: Arc<dyn CredentialProvider>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ApiError> {
        let event_url =
            Url::parse(hec_url).map_err(|err| ApiError::Config(format!("invalid HEC URL `{hec_url}`: {err}")))?;
        let health_url = health_url(&event_url);
        Ok(Self { http, event_url, health_url, settings, auth, clock })
    }

    pub fn health_url(&self) -> &Url {
        &self.health_url
    }
}

/// The collector's health endpoint on the same host as the event endpoint.
fn health_url(event_url: &Url) -> Url {
    let mut url = event_url.clone();
    url.set_path(HEC_HEALTH_PATH);
    url.set_query(None);
    url
}

#[async_trait]
impl EventSink for HecClient {
    #[instrument(skip(self, batch), fields(batch = batch.index, size = batch.len()))]
    async fn send_batch(&self, batch: &Batch) -> Result<(), ApiError> {
        let body = encode_batch(batch, &self.settings, self.clock.now())?;
        let authorization = self.auth.authorization_header().await?;

        let builder = self
            .http
            .request(Method::POST, self.event_url.clone())
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        self.http.send(builder).await?;
        debug!("collector accepted batch");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), ApiError> {
        let authorization = self.auth.authorization_header().await?;
        let builder = self.http.request(Method::GET, self.health_url.clone()).header(AUTHORIZATION, authorization);
        self.http.send(builder).await?;
        Ok(())
    }
}
