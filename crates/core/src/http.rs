//! Request and response representations exchanged with the host.
//!
//! These are deliberately small: the engine never speaks HTTP itself, it
//! only needs the method, URL, and headers of a request and the status,
//! headers, and body of a response.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

/// Credentials mode attached to an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Credentials {
    /// Never send cookies or authorization headers.
    Omit,
    /// Send credentials only to the request's own origin.
    #[default]
    SameOrigin,
    /// Always send credentials.
    Include,
}

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Upper-cased HTTP method.
    pub method: String,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub credentials: Credentials,
}

impl Request {
    pub fn new(method: &str, url: Url) -> Self {
        Self { method: method.to_ascii_uppercase(), url, headers: Vec::new(), credentials: Credentials::default() }
    }

    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn accept(&self) -> Option<&str> {
        self.header("accept")
    }

    /// Whether the request is a plain read that may be intercepted.
    pub fn is_read(&self) -> bool {
        self.method == "GET"
    }
}

/// A response body with its metadata.
///
/// The body is consumed once by whichever sink receives the response, so
/// there is intentionally no `Clone`; use [`Response::duplicate`] before
/// handing a response to more than one sink.
#[derive(Debug, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// Final URL after redirects, when the transport reports one.
    pub url: Option<String>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, headers: Vec::new(), body: body.into(), url: None }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// False when the response forbids storage via `Cache-Control: no-store`.
    pub fn is_storable(&self) -> bool {
        !self
            .header("cache-control")
            .is_some_and(|v| v.split(',').any(|d| d.trim().eq_ignore_ascii_case("no-store")))
    }

    /// Structural copy of the response, taken before fan-out to several sinks.
    pub fn duplicate(&self) -> Self {
        Self { status: self.status, headers: self.headers.clone(), body: self.body.clone(), url: self.url.clone() }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
