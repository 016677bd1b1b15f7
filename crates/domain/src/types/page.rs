//! One page of the source API's paginated audit-log listing

use serde::{Deserialize, Serialize};

use super::record::AuditRecord;
use super::window::TimeWindow;

/// Query for a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub organization_id: String,
    pub window: TimeWindow,
    pub limit: usize,
    /// Opaque continuation token returned by the previous page.
    pub page_token: Option<String>,
}

/// A page as returned by the source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditPage {
    #[serde(default)]
    pub items: Vec<AuditRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

impl AuditPage {
    /// Continuation token, treating an empty string as "no more pages".
    pub fn continuation(&self) -> Option<&str> {
        self.next_token.as_deref().filter(|token| !token.is_empty())
    }
}
