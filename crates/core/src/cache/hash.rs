//! Request key generation.

use sha2::{Digest, Sha256};

use crate::http::Request;

/// Compute the key an entry is stored under.
///
/// `url` is expected to be canonical already (fragment removed, host
/// lower-cased); `vary` carries the request headers that select between
/// variants, empty when none apply.
pub fn compute_request_key(method: &str, url: &str, vary: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hasher.update(b"\n");
    hasher.update(vary.as_bytes());
    hex::encode(hasher.finalize())
}

/// Key for an intercepted request: method plus URL without its fragment.
pub fn request_key(request: &Request) -> String {
    let mut url = request.url.clone();
    url.set_fragment(None);
    compute_request_key(&request.method, url.as_str(), "")
}
