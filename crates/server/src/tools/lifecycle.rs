//! sw_install and sw_activate tool implementations.

use acadia_client::{CacheAgent, LifecycleState};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::{Deserialize, Serialize};

use super::json_result;

/// Output from the sw_install tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwInstallOutput {
    pub version_tag: String,
    /// Number of mandatory static assets cached.
    pub precached: usize,
    pub state: LifecycleState,
}

/// Output from the sw_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwActivateOutput {
    pub version_tag: String,
    /// Partitions of other releases that were deleted.
    pub stale_deleted: usize,
    pub state: LifecycleState,
}

pub async fn install_impl(agent: &CacheAgent) -> Result<CallToolResult, McpError> {
    let precached = agent.install().await?;
    let output =
        SwInstallOutput { version_tag: agent.version_tag().to_string(), precached, state: agent.state().await };
    json_result(&output)
}

pub async fn activate_impl(agent: &CacheAgent) -> Result<CallToolResult, McpError> {
    let stale_deleted = agent.activate().await?;
    let output =
        SwActivateOutput { version_tag: agent.version_tag().to_string(), stale_deleted, state: agent.state().await };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::tools::test_support::{StubTransport, agent, output};
    use acadia_core::{Request, Response};

    #[tokio::test]
    async fn test_install_then_activate() {
        let transport = Arc::new(StubTransport::with(&[
            ("/offline.html", 200, "text/html", "offline"),
            ("/app.css", 200, "text/css", "body{}"),
        ]));
        let (db, agent) = agent(transport, &["/app.css"]).await;
        let stale = Request::get(url::Url::parse("https://www.example.com/").unwrap());
        db.put_entry("v2/acadia/sw/pages", &stale, &Response::new(200, "old"))
            .await
            .unwrap();

        let installed = output(&install_impl(&agent).await.unwrap());
        assert_eq!(installed["precached"], 1);
        assert_eq!(installed["state"], "installed");

        let activated = output(&activate_impl(&agent).await.unwrap());
        assert_eq!(activated["stale_deleted"], 1);
        assert_eq!(activated["state"], "activated");
        assert_eq!(activated["version_tag"], "v3");
    }

    #[tokio::test]
    async fn test_install_failure_is_an_error() {
        let transport = Arc::new(StubTransport::with(&[]));
        let (_db, agent) = agent(transport, &["/missing.css"]).await;

        let err = install_impl(&agent).await.unwrap_err();
        assert_eq!(err.code.0, -32005);
        assert_eq!(agent.state().await, LifecycleState::Redundant);
    }

    #[tokio::test]
    async fn test_activate_without_install_is_rejected() {
        let transport = Arc::new(StubTransport::with(&[]));
        let (_db, agent) = agent(transport, &[]).await;

        let err = activate_impl(&agent).await.unwrap_err();
        assert_eq!(err.code.0, -32006);
    }
}
