//! sw_message tool implementation.
//!
//! Posts a control message to the agent. Returns as soon as the message is
//! handled; any trimming it schedules keeps running in the background.

use acadia_client::{CacheAgent, ControlMessage, MessageOutcome};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message command. "trimCaches" trims pages and images; anything else is ignored.
    pub command: Option<String>,
}

/// Output from the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwMessageOutput {
    pub outcome: MessageOutcome,
}

pub async fn message_impl(agent: &CacheAgent, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let message = ControlMessage { command: params.command };
    let outcome = agent.message(&message);
    json_result(&SwMessageOutput { outcome })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::tools::test_support::{StubTransport, agent, output};
    use acadia_core::{Request, Response, Role};

    #[tokio::test]
    async fn test_trim_caches_message() {
        let transport = Arc::new(StubTransport::with(&[]));
        let (db, agent) = agent(transport, &[]).await;
        let images = agent.partition_name(Role::Images);
        for i in 0..25 {
            let url = url::Url::parse(&format!("https://www.example.com/{i}.png")).unwrap();
            db.put_entry(&images, &Request::get(url), &Response::new(200, "png"))
                .await
                .unwrap();
        }

        let params = SwMessageParams { command: Some("trimCaches".into()) };
        let out = output(&message_impl(&agent, params).await.unwrap());
        assert_eq!(out["outcome"], "trim_scheduled");

        agent.settle().await;
        assert_eq!(db.count_entries(&images).await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_unknown_command_ignored() {
        let transport = Arc::new(StubTransport::with(&[]));
        let (_db, agent) = agent(transport, &[]).await;

        let out = output(&message_impl(&agent, SwMessageParams { command: None }).await.unwrap());
        assert_eq!(out["outcome"], "ignored");
    }
}
