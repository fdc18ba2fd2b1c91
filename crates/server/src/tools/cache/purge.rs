//! cache_purge tool implementation.
//!
//! Trims a partition of the current release, deletes other releases'
//! partitions, or both.

use acadia_client::CacheAgent;
use acadia_core::{Error, Role};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::super::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Partition role to trim.
    pub role: Option<Role>,

    /// Keep at most this many entries in `role`, evicting the oldest.
    pub max_entries: Option<usize>,

    /// Delete every partition that does not belong to the running release.
    #[serde(default)]
    pub clear_stale: bool,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Entries evicted from the trimmed partition.
    pub entries_deleted: usize,
    /// Stale partitions deleted.
    pub partitions_deleted: usize,
}

pub async fn purge_impl(agent: &CacheAgent, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let trim = match (params.role, params.max_entries) {
        (Some(role), Some(max)) => Some((role, max)),
        (None, None) => None,
        _ => {
            return Err(Error::InvalidInput("role and max_entries must be given together".to_string()).into());
        }
    };
    if trim.is_none() && !params.clear_stale {
        return Err(Error::InvalidInput("Specify role with max_entries, or clear_stale".to_string()).into());
    }

    let mut output = CachePurgeOutput { entries_deleted: 0, partitions_deleted: 0 };

    if let Some((role, max)) = trim {
        output.entries_deleted = agent.partitions().trim(&agent.partition_name(role), max).await?;
    }

    if params.clear_stale {
        output.partitions_deleted = agent.partitions().clear_stale(agent.version_tag()).await?;
    }

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::tools::test_support::{StubTransport, agent, output};
    use acadia_core::{Request, Response};

    fn page(i: usize) -> Request {
        Request::get(url::Url::parse(&format!("https://www.example.com/post/{i}")).unwrap())
    }

    #[tokio::test]
    async fn test_purge_trims_role() {
        let (db, agent) = agent(Arc::new(StubTransport::with(&[])), &[]).await;
        let pages = agent.partition_name(Role::Pages);
        for i in 0..10 {
            db.put_entry(&pages, &page(i), &Response::new(200, "")).await.unwrap();
        }

        let params = CachePurgeParams { role: Some(Role::Pages), max_entries: Some(4), clear_stale: false };
        let out = output(&purge_impl(&agent, params).await.unwrap());
        assert_eq!(out["entries_deleted"], 6);
        assert_eq!(db.count_entries(&pages).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_purge_clears_stale() {
        let (db, agent) = agent(Arc::new(StubTransport::with(&[])), &[]).await;
        db.create_partition("v1/acadia/sw/static").await.unwrap();
        db.create_partition("v3/acadia/sw/static").await.unwrap();

        let params = CachePurgeParams { role: None, max_entries: None, clear_stale: true };
        let out = output(&purge_impl(&agent, params).await.unwrap());
        assert_eq!(out["partitions_deleted"], 1);
        assert_eq!(db.list_partitions().await.unwrap(), vec!["v3/acadia/sw/static".to_string()]);
    }

    #[tokio::test]
    async fn test_purge_no_params() {
        let (_db, agent) = agent(Arc::new(StubTransport::with(&[])), &[]).await;

        let params = CachePurgeParams { role: None, max_entries: None, clear_stale: false };
        assert!(purge_impl(&agent, params).await.is_err());

        let params = CachePurgeParams { role: Some(Role::Images), max_entries: None, clear_stale: false };
        assert!(purge_impl(&agent, params).await.is_err());
    }
}
