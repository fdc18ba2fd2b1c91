//! cache_get tool implementation.
//!
//! Retrieves cached entry metadata for a URL, from one partition role of the
//! running release or from every partition that holds it.

use acadia_client::{CacheAgent, resolve};
use acadia_core::{
    CacheDb, Error, Request, Role,
    cache::{CachedEntry, hash::request_key, partition::belongs_to},
};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::super::json_result;
use crate::error::ToolError;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// Partition role of the running release: "static", "pages", or "images".
    /// When omitted, every partition holding the URL is reported, stale ones included.
    #[serde(default)]
    pub role: Option<Role>,
}

/// Metadata of one cached entry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheEntryInfo {
    pub partition: String,
    /// Whether the partition belongs to the running release.
    pub current: bool,
    pub request_key: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body_bytes: usize,
    pub stored_at: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub url: String,
    pub entries: Vec<CacheEntryInfo>,
}

pub async fn get_impl(db: &CacheDb, agent: &CacheAgent, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = resolve(&agent.settings().origin, &params.url).map_err(|e| ToolError::InvalidInput(e.to_string()))?;

    let entries = match params.role {
        Some(role) => {
            let partition = agent.partition_name(role);
            let key = request_key(&Request::get(url.clone()));
            db.get_entry(&partition, &key).await?.into_iter().collect()
        }
        None => db.entries_for_url(url.as_str()).await?,
    };
    if entries.is_empty() {
        return Err(Error::CacheMiss(url.to_string()).into());
    }

    let output = CacheGetOutput {
        url: url.to_string(),
        entries: entries.into_iter().map(|e| describe(e, agent.version_tag())).collect(),
    };
    json_result(&output)
}

fn describe(entry: CachedEntry, version_tag: &str) -> CacheEntryInfo {
    CacheEntryInfo {
        current: belongs_to(&entry.partition, version_tag),
        content_type: entry.response.content_type().map(str::to_string),
        body_bytes: entry.response.body.len(),
        status: entry.response.status,
        headers: entry.response.headers,
        partition: entry.partition,
        request_key: entry.request_key,
        method: entry.method,
        url: entry.url,
        stored_at: entry.stored_at,
    }
}
