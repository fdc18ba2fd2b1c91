//! Request classification.
//!
//! A pure function of the request's method and `Accept` header: no network
//! or storage access happens here.

use acadia_core::Request;
use serde::{Deserialize, Serialize};

/// Category of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestClass {
    /// Not a read; the host handles it untouched.
    Skip,
    /// HTML navigation or document.
    Document,
    Image,
    /// Any other readable asset.
    Generic,
}

/// How a request class is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    PassThrough,
    NetworkFirst,
    CacheFirst,
}

impl RequestClass {
    pub fn strategy(self) -> Strategy {
        match self {
            RequestClass::Skip => Strategy::PassThrough,
            RequestClass::Document => Strategy::NetworkFirst,
            RequestClass::Image | RequestClass::Generic => Strategy::CacheFirst,
        }
    }
}

/// Classify a request by method and `Accept` header.
///
/// HTML wins over images when both appear in the header.
pub fn classify(request: &Request) -> RequestClass {
    if !request.is_read() {
        return RequestClass::Skip;
    }

    let accept = request.accept().map(str::to_ascii_lowercase).unwrap_or_default();
    if accept.contains("text/html") {
        RequestClass::Document
    } else if accept.contains("image") {
        RequestClass::Image
    } else {
        RequestClass::Generic
    }
}
