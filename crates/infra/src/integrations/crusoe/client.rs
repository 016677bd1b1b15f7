//! Source adapter for the organization audit-log listing
//!
//! `GET {base_url}/organizations/{org_id}/audit-logs?start_time&end_time&limit[&next_token]`
//! returning `{"items": [...], "next_token": "..."}`.

use std::sync::Arc;

use async_trait::async_trait;
use auditbridge_core::AuditLogSource;
use auditbridge_domain::{ApiError, AuditPage, PageRequest, SourceConfig};
use chrono::SecondsFormat;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Method;
use tracing::{debug, instrument};
use url::Url;

use crate::auth::CredentialProvider;
use crate::http::HttpClient;

/// Client for the source API's audit-log endpoint.
pub struct CrusoeAuditClient {
    http: HttpClient,
    base_url: Url,
    auth: Arc<dyn CredentialProvider>,
}

impl CrusoeAuditClient {
    /// # Errors
    /// Returns `ApiError::Config` if `base_url` is not an absolute URL.
    pub fn new(
        http: HttpClient,
        base_url: &str,
        auth: Arc<dyn CredentialProvider>,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| ApiError::Config(format!("invalid source base URL `{base_url}`: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Config(format!("source base URL `{base_url}` cannot be a base")));
        }
        Ok(Self { http, base_url, auth })
    }

    /// Build a client from the source section of the configuration.
    pub fn from_config(
        http: HttpClient,
        config: &SourceConfig,
        auth: Arc<dyn CredentialProvider>,
    ) -> Result<Self, ApiError> {
        Self::new(http, &config.base_url, auth)
    }

    fn audit_logs_url(&self, organization_id: &str) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Config("source base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(["organizations", organization_id, "audit-logs"]);
        Ok(url)
    }
}

#[async_trait]
impl AuditLogSource for CrusoeAuditClient {
    #[instrument(skip(self, request), fields(limit = request.limit, continued = request.page_token.is_some()))]
    async fn fetch_page(&self, request: &PageRequest) -> Result<AuditPage, ApiError> {
        let url = self.audit_logs_url(&request.organization_id)?;
        let authorization = self.auth.authorization_header().await?;

        let mut query = vec![
            ("start_time", request.window.start().to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("end_time", request.window.end().to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("limit", request.limit.to_string()),
        ];
        if let Some(token) = &request.page_token {
            query.push(("next_token", token.clone()));
        }

        let builder = self
            .http
            .request(Method::GET, url)
            .header(AUTHORIZATION, authorization)
            .header(ACCEPT, "application/json")
            .query(&query);

        let response = self.http.send(builder).await?;
        let body = response
            .bytes()
            .await
            .map_err(|err| ApiError::Network(format!("failed to read response body: {err}")))?;
        let page: AuditPage = serde_json::from_slice(&body)
            .map_err(|err| ApiError::Payload(format!("invalid audit-log page: {err}")))?;

        debug!(items = page.items.len(), has_more = page.continuation().is_some(), "received page");
        Ok(page)
    }
}
