//! sw_fetch tool implementation.
//!
//! Delivers a fetch event to the agent and reports how it was answered.

use std::collections::BTreeMap;

use acadia_client::{CacheAgent, FetchEvent, Interception, ResponseSource, resolve};
use acadia_core::{Credentials, Request};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::error::ToolError;

/// Bodies longer than this are truncated in the output.
const MAX_BODY_PREVIEW: usize = 64 * 1024;

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Accept header, e.g. "text/html" for a navigation or "image/*".
    #[serde(default)]
    pub accept: Option<String>,

    /// Additional request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Credentials mode: "omit", "same-origin" (default), or "include".
    #[serde(default)]
    pub credentials: Credentials,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwFetchOutput {
    pub url: String,
    /// False when the host's default handling applies.
    pub intercepted: bool,
    pub source: Option<ResponseSource>,
    pub status: Option<u16>,
    pub content_type: Option<String>,
    pub body: Option<String>,
    pub truncated: bool,
}

pub async fn fetch_impl(agent: &CacheAgent, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(agent, params)?;
    let url = request.url.to_string();

    let output = match agent.fetch(FetchEvent::new(request)).await? {
        Interception::NotIntercepted => SwFetchOutput {
            url,
            intercepted: false,
            source: None,
            status: None,
            content_type: None,
            body: None,
            truncated: false,
        },
        Interception::Responded { response, source } => {
            let mut body = response.text();
            let truncated = body.len() > MAX_BODY_PREVIEW;
            if truncated {
                let mut end = MAX_BODY_PREVIEW;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                body.truncate(end);
            }
            SwFetchOutput {
                url,
                intercepted: true,
                source: Some(source),
                status: Some(response.status),
                content_type: response.content_type().map(str::to_string),
                body: Some(body),
                truncated,
            }
        }
    };

    json_result(&output)
}

fn build_request(agent: &CacheAgent, params: SwFetchParams) -> Result<Request, ToolError> {
    let method = params.method.trim();
    if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ToolError::InvalidInput(format!("invalid method: {:?}", params.method)));
    }

    let url = resolve(&agent.settings().origin, &params.url).map_err(|e| ToolError::InvalidInput(e.to_string()))?;
    let mut request = Request::new(method, url).with_credentials(params.credentials);
    if let Some(accept) = params.accept {
        request = request.with_header("Accept", accept);
    }
    for (name, value) in params.headers {
        request = request.with_header(name, value);
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::tools::test_support::{StubTransport, agent, output};

    fn params(url: &str, accept: Option<&str>) -> SwFetchParams {
        SwFetchParams {
            url: url.into(),
            method: default_method(),
            accept: accept.map(str::to_string),
            headers: BTreeMap::new(),
            credentials: Credentials::default(),
        }
    }

    #[tokio::test]
    async fn test_fetch_before_activation() {
        let transport = Arc::new(StubTransport::with(&[("/", 200, "text/html", "home")]));
        let (_db, agent) = agent(transport, &[]).await;

        let out = output(&fetch_impl(&agent, params("/", Some("text/html"))).await.unwrap());
        assert_eq!(out["intercepted"], false);
        assert_eq!(out["url"], "https://www.example.com/");
    }

    #[tokio::test]
    async fn test_fetch_offline_document() {
        let transport = Arc::new(StubTransport::with(&[("/offline.html", 200, "text/html", "offline")]));
        let (_db, agent) = agent(transport.clone(), &[]).await;
        agent.start().await.unwrap();
        agent.settle().await;
        transport.offline.store(true, Ordering::SeqCst);

        let out = output(&fetch_impl(&agent, params("/posts/1", Some("text/html"))).await.unwrap());
        assert_eq!(out["intercepted"], true);
        assert_eq!(out["source"], "offline_fallback");
        assert_eq!(out["body"], "offline");
    }

    #[tokio::test]
    async fn test_fetch_image_placeholder() {
        let transport = Arc::new(StubTransport::with(&[]));
        let (_db, agent) = agent(transport, &[]).await;
        agent.start().await.unwrap();

        let out = output(&fetch_impl(&agent, params("/a.png", Some("image/png"))).await.unwrap());
        assert_eq!(out["source"], "placeholder");
        assert_eq!(out["content_type"], "image/svg+xml");
    }

    #[tokio::test]
    async fn test_fetch_post_passes_through() {
        let transport = Arc::new(StubTransport::with(&[]));
        let (_db, agent) = agent(transport, &[]).await;
        agent.start().await.unwrap();

        let mut p = params("/form", Some("text/html"));
        p.method = "post".into();
        let out = output(&fetch_impl(&agent, p).await.unwrap());
        assert_eq!(out["intercepted"], false);
    }

    #[tokio::test]
    async fn test_fetch_rejects_bad_input() {
        let transport = Arc::new(StubTransport::with(&[]));
        let (_db, agent) = agent(transport, &[]).await;

        let mut p = params("/", None);
        p.method = "GE T".into();
        assert_eq!(fetch_impl(&agent, p).await.unwrap_err().code.0, -32602);
        assert_eq!(fetch_impl(&agent, params("", None)).await.unwrap_err().code.0, -32602);
    }
}
