//! In-process transport for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use acadia_core::{Request, Response};

use crate::fetch::{Transport, TransportError};

pub const ORIGIN: &str = "https://www.example.com";

/// GET request for a path on [`ORIGIN`].
pub fn get(path: &str, accept: Option<&str>) -> Request {
    let request = Request::get(url::Url::parse(&format!("{ORIGIN}{path}")).unwrap());
    match accept {
        Some(accept) => request.with_header("Accept", accept),
        None => request,
    }
}

/// Serves canned responses by path and records every call.
///
/// Unrouted paths fail as unreachable.
#[derive(Default)]
pub struct RecordingTransport {
    routes: Mutex<HashMap<String, (u16, String, String)>>,
    hanging: Mutex<HashSet<String>>,
    offline: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, path: &str, status: u16, content_type: &str, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, content_type.to_string(), body.to_string()));
    }

    /// Requests for `path` never resolve.
    pub fn hang(&self, path: &str) {
        self.hanging.lock().unwrap().insert(path.to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn fetch(&self, request: &Request) -> Result<Response, TransportError> {
        let path = request.url.path().to_string();
        self.calls.lock().unwrap().push(path.clone());

        let hangs = self.hanging.lock().unwrap().contains(&path);
        if hangs {
            std::future::pending::<()>().await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::Network("offline".into()));
        }

        let route = self.routes.lock().unwrap().get(&path).cloned();
        match route {
            Some((status, content_type, body)) => {
                Ok(Response::new(status, body).with_header("Content-Type", content_type))
            }
            None => Err(TransportError::Network(format!("unreachable: {path}"))),
        }
    }
}
