//! Credential providers for the remote adapters
//!
//! Adapters ask a [`CredentialProvider`] for the full `Authorization` header
//! value on every request, so rotating or refreshing schemes can be plugged in
//! without touching the clients.

use std::fmt;

use async_trait::async_trait;
use auditbridge_domain::ApiError;

/// Trait for providing request credentials
///
/// This trait allows dependency injection and testing with mock providers.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Value for the `Authorization` header.
    async fn authorization_header(&self) -> Result<String, ApiError>;
}

/// A fixed token sent with a fixed scheme.
#[derive(Clone)]
pub struct StaticTokenProvider {
    scheme: &'static str,
    token: String,
}

impl StaticTokenProvider {
    /// `Authorization: Bearer <token>` (source API).
    pub fn bearer(token: impl Into<String>) -> Self {
        Self { scheme: "Bearer", token: token.into() }
    }

    /// `Authorization: Splunk <token>` (HEC sink).
    pub fn splunk(token: impl Into<String>) -> Self {
        Self { scheme: "Splunk", token: token.into() }
    }
}

impl fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("scheme", &self.scheme)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn authorization_header(&self) -> Result<String, ApiError> {
        if self.token.trim().is_empty() {
            return Err(ApiError::Config(format!("{} token is empty", self.scheme)));
        }
        Ok(format!("{} {}", self.scheme, self.token))
    }
}
