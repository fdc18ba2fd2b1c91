//! MCP server handler implementation.
//!
//! Routes tool calls to the agent that owns the partition store.
use std::sync::Arc;

use acadia_client::CacheAgent;
use acadia_core::CacheDb;

use crate::tools::{
    CacheGetParams, CachePurgeParams, SwFetchParams, SwMessageParams, cache, fetch::fetch_impl, lifecycle,
    message::message_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The MCP control surface for one cache agent.
#[derive(Clone)]
pub struct AgentServer {
    agent: Arc<CacheAgent>,
    db: CacheDb,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl AgentServer {
    pub fn new(agent: Arc<CacheAgent>, db: CacheDb) -> Self {
        Self { agent, db, tool_router: Self::tool_router() }
    }

    /// Run the install event: precache the offline set and mandatory assets.
    #[tool(description = "Install the agent: cache the offline page set and all mandatory static assets.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        lifecycle::install_impl(&self.agent).await
    }

    /// Run the activate event: delete stale partitions, then claim clients.
    #[tool(description = "Activate the agent: delete other releases' partitions, then start intercepting requests.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        lifecycle::activate_impl(&self.agent).await
    }

    #[tool(description = "Deliver a fetch event. Returns whether it was intercepted, the response, and its source.")]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.agent, params.0).await
    }

    #[tool(description = "Post a control message. The \"trimCaches\" command trims pages and images in the background.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.agent, params.0).await
    }

    #[tool(description = "Retrieve cached entry metadata for a URL, from one partition role or from every partition holding it.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        cache::get_impl(&self.db, &self.agent, params.0).await
    }

    #[tool(description = "Trim a partition role to a maximum entry count, and/or delete stale partitions.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        cache::purge_impl(&self.agent, params.0).await
    }
}

impl ServerHandler for AgentServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "acadia-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
