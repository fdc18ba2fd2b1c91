//! Host transport: network access for the interception engine.
//!
//! ### Contract
//! - Any HTTP status is a resolved response; only network errors,
//!   body read errors, oversized bodies, and timeouts are failures.
//! - No timeout unless one is configured; a hung fetch stays pending.
//!
//! ### Credentials
//! - `omit`: `Cookie` and `Authorization` headers are never sent.
//! - `same-origin`: sent only when the request targets the configured origin.
//! - `include`: always sent.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, canonicalize, resolve};

use acadia_core::{AppConfig, Credentials, Error, Request, Response};

/// Error type for transport failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timeout")]
    Timeout,

    #[error("response too large: {size} bytes exceeds {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("aborted")]
    Aborted,
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { TransportError::Timeout } else { TransportError::Network(err.to_string()) }
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Error::TransportFailure(err.to_string())
    }
}

/// Network access as provided by the host.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, TransportError>;
}

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "acadia-sw/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Optional request timeout (default: none)
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Origin used to decide `same-origin` credentials.
    pub origin: Option<reqwest::Url>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "acadia-sw/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: None,
            max_redirects: 5,
            origin: None,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            origin: reqwest::Url::parse(&config.origin).ok(),
            ..Default::default()
        }
    }
}

fn is_credential_header(name: &str) -> bool {
    name.eq_ignore_ascii_case("cookie") || name.eq_ignore_ascii_case("authorization")
}

/// reqwest-backed transport.
pub struct HttpTransport {
    http: Client,
    config: FetchConfig,
}

impl HttpTransport {
    /// Create a new transport with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| Error::TransportFailure(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Whether credential headers may be forwarded for this request.
    fn sends_credentials(&self, request: &Request) -> bool {
        match request.credentials {
            Credentials::Omit => false,
            Credentials::Include => true,
            Credentials::SameOrigin => match &self.config.origin {
                Some(origin) => origin.origin() == request.url.origin(),
                None => true,
            },
        }
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: &Request) -> Result<Response, TransportError> {
        let start = Instant::now();
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let send_credentials = self.sends_credentials(request);
        let mut builder = self.http.request(method, request.url.clone());
        for (name, value) in &request.headers {
            if !send_credentials && is_credential_header(name) {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;

        let status = response.status();
        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(TransportError::TooLarge { size: len as usize, limit: self.config.max_bytes });
        }

        let final_url = response.url().to_string();
        let headers = header_pairs(response.headers());
        let bytes: Bytes = response.bytes().await?;

        if bytes.len() > self.config.max_bytes {
            return Err(TransportError::TooLarge { size: bytes.len(), limit: self.config.max_bytes });
        }

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(Response { status: status.as_u16(), headers, body: bytes, url: Some(final_url) })
    }
}

fn header_pairs(headers: &header::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect()
}
