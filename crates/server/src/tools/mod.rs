//! MCP tool implementations.
//!
//! Lifecycle tools drive the agent through install and activation, `sw_fetch`
//! and `sw_message` deliver host events, and the cache tools inspect and trim
//! partitions.

pub mod cache;
pub mod fetch;
pub mod lifecycle;
pub mod message;

pub use cache::{CacheGetParams, CachePurgeParams};
pub use fetch::SwFetchParams;
pub use message::SwMessageParams;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

/// Encode a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| ToolError::OutputFailed(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
