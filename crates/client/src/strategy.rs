//! Interception strategies.
//!
//! - Documents: network first, offline page from the static partition on failure.
//! - Images: cache first, stash successful network copies in the images
//!   partition, placeholder graphic on failure.
//! - Everything else readable: cache first, failures surface to the caller.
//! - Non-reads are never intercepted.

use std::sync::Arc;

use tokio::sync::oneshot;

use acadia_core::{Error, PartitionManager, PartitionNames, Request, Response, Role};

use crate::classify::{RequestClass, classify};
use crate::fetch::{Transport, TransportError};
use crate::tasks::BackgroundTasks;

/// Inline graphic served when an image cannot be fetched.
pub const OFFLINE_IMAGE_SVG: &str = r##"<svg width="100" height="100" viewBox="0 0 100 100" xmlns="http://www.w3.org/2000/svg"><title>Offline</title><path d="M55.14 52.86l-2.28 2.28c-.2.2-.52.2-.72 0L50 53l-2.14 2.14c-.2.2-.52.2-.72 0l-2.28-2.28c-.2-.2-.2-.52 0-.72L47 50l-2.14-2.14c-.2-.2-.2-.52 0-.72l2.28-2.28c.2-.2.52-.2.72 0L50 47l2.14-2.14c.2-.2.52-.2.72 0l2.28 2.28c.2.2.2.52 0 .72L53 50l2.14 2.14c.2.2.2.52 0 .72zM58.5 50c0-4.7-3.8-8.5-8.5-8.5s-8.5 3.8-8.5 8.5 3.8 8.5 8.5 8.5 8.5-3.8 8.5-8.5zm3.5 0c0 6.63-5.38 12-12 12-6.63 0-12-5.38-12-12 0-6.63 5.38-12 12-12 6.63 0 12 5.38 12 12z" fill="#CCC"/></svg>"##;

/// Placeholder image response, marked non-cacheable.
pub fn offline_image() -> Response {
    Response::new(200, OFFLINE_IMAGE_SVG)
        .with_header("Content-Type", "image/svg+xml")
        .with_header("Cache-Control", "no-store")
}

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    OfflineFallback,
    Placeholder,
}

/// Result of offering a request to the engine.
#[derive(Debug)]
pub enum Interception {
    /// The host's default handling applies.
    NotIntercepted,
    Responded { response: Response, source: ResponseSource },
}

impl Interception {
    pub fn response(&self) -> Option<&Response> {
        match self {
            Interception::NotIntercepted => None,
            Interception::Responded { response, .. } => Some(response),
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            Interception::NotIntercepted => None,
            Interception::Responded { source, .. } => Some(*source),
        }
    }
}

/// Host-side handle that cancels an in-flight interception.
pub struct AbortHandle(oneshot::Sender<()>);

/// Engine-side view of [`AbortHandle`].
pub struct AbortSignal(oneshot::Receiver<()>);

impl AbortHandle {
    pub fn abort(self) {
        let _ = self.0.send(());
    }
}

impl AbortSignal {
    /// Resolves only on an explicit abort; a dropped handle never fires.
    async fn aborted(self) {
        if self.0.await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

pub fn abort_pair() -> (AbortHandle, AbortSignal) {
    let (tx, rx) = oneshot::channel();
    (AbortHandle(tx), AbortSignal(rx))
}

/// Partition lookup order for cache-first classes.
fn lookup_order(class: RequestClass) -> &'static [Role] {
    match class {
        RequestClass::Image => &[Role::Images, Role::Static, Role::Pages],
        _ => &[Role::Static, Role::Pages, Role::Images],
    }
}

/// Executes the per-class strategy for intercepted requests.
#[derive(Clone)]
pub struct StrategyEngine {
    transport: Arc<dyn Transport>,
    partitions: PartitionManager,
    names: PartitionNames,
    offline_request: Request,
    tasks: BackgroundTasks,
}

impl StrategyEngine {
    pub fn new(
        transport: Arc<dyn Transport>, partitions: PartitionManager, names: PartitionNames, offline_request: Request,
        tasks: BackgroundTasks,
    ) -> Self {
        Self { transport, partitions, names, offline_request, tasks }
    }

    /// Serve an intercepted request.
    ///
    /// An `Err` is an unhandled fetch failure the host surfaces to the page.
    pub async fn handle(&self, request: Request, abort: Option<AbortSignal>) -> Result<Interception, Error> {
        let class = classify(&request);
        tracing::debug!(method = %request.method, url = %request.url, ?class, "intercept");

        match class {
            RequestClass::Skip => Ok(Interception::NotIntercepted),
            RequestClass::Document => self.network_first(&request, abort).await,
            RequestClass::Image | RequestClass::Generic => self.cache_first(&request, class, abort).await,
        }
    }

    async fn fetch(&self, request: &Request, abort: Option<AbortSignal>) -> Result<Response, TransportError> {
        match abort {
            None => self.transport.fetch(request).await,
            Some(signal) => {
                tokio::select! {
                    result = self.transport.fetch(request) => result,
                    () = signal.aborted() => Err(TransportError::Aborted),
                }
            }
        }
    }

    async fn network_first(&self, request: &Request, abort: Option<AbortSignal>) -> Result<Interception, Error> {
        match self.fetch(request, abort).await {
            Ok(response) => Ok(Interception::Responded { response, source: ResponseSource::Network }),
            Err(err) => {
                tracing::debug!(url = %request.url, error = %err, "document fetch failed, serving offline page");
                let statics = self.partitions.partition(&self.names.name(Role::Static));
                match statics.lookup(&self.offline_request).await? {
                    Some(response) => Ok(Interception::Responded { response, source: ResponseSource::OfflineFallback }),
                    None => Err(Error::MissingFallbackAsset(self.offline_request.url.to_string())),
                }
            }
        }
    }

    async fn cache_first(
        &self, request: &Request, class: RequestClass, abort: Option<AbortSignal>,
    ) -> Result<Interception, Error> {
        for role in lookup_order(class) {
            let partition = self.partitions.partition(&self.names.name(*role));
            if let Some(response) = partition.lookup(request).await? {
                tracing::debug!(url = %request.url, partition = partition.name(), "cache hit");
                return Ok(Interception::Responded { response, source: ResponseSource::Cache });
            }
        }

        match self.fetch(request, abort).await {
            Ok(response) => {
                if class == RequestClass::Image && response.is_success() && response.is_storable() {
                    self.stash(Role::Images, request.clone(), response.duplicate());
                }
                Ok(Interception::Responded { response, source: ResponseSource::Network })
            }
            Err(err) if class == RequestClass::Image => {
                tracing::debug!(url = %request.url, error = %err, "image fetch failed, serving placeholder");
                Ok(Interception::Responded { response: offline_image(), source: ResponseSource::Placeholder })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Write a response copy in the background; failures are logged only.
    fn stash(&self, role: Role, request: Request, response: Response) {
        let partitions = self.partitions.clone();
        let name = self.names.name(role);
        self.tasks.spawn(async move {
            let result = match partitions.open(&name).await {
                Ok(partition) => partition.put(&request, &response).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                tracing::warn!(partition = %name, url = %request.url, error = %e, "failed to stash response");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingTransport, get};
    use acadia_core::CacheDb;

    struct Fixture {
        db: CacheDb,
        transport: Arc<RecordingTransport>,
        tasks: BackgroundTasks,
        engine: StrategyEngine,
        names: PartitionNames,
    }

    async fn fixture() -> Fixture {
        let db = CacheDb::open_in_memory().await.unwrap();
        let transport = Arc::new(RecordingTransport::new());
        let tasks = BackgroundTasks::new();
        let names = PartitionNames::new("v1", "acadia/sw");
        let engine = StrategyEngine::new(
            transport.clone(),
            PartitionManager::new(Arc::new(db.clone())),
            names.clone(),
            get("/offline.html", None),
            tasks.clone(),
        );
        Fixture { db, transport, tasks, engine, names }
    }

    #[tokio::test]
    async fn test_non_read_is_not_intercepted() {
        let f = fixture().await;
        let post = Request::new("POST", get("/form", None).url).with_header("Accept", "text/html");

        let outcome = f.engine.handle(post, None).await.unwrap();
        assert!(matches!(outcome, Interception::NotIntercepted));
        assert_eq!(f.transport.call_count(), 0);
        assert!(f.db.list_partitions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_document_prefers_network_over_cache() {
        let f = fixture().await;
        let page = get("/", Some("text/html"));
        f.db.put_entry(&f.names.name(Role::Static), &page, &Response::new(200, "stale"))
            .await
            .unwrap();
        f.transport.route("/", 200, "text/html", "fresh");

        let outcome = f.engine.handle(page, None).await.unwrap();
        assert_eq!(outcome.source(), Some(ResponseSource::Network));
        assert_eq!(outcome.response().unwrap().text(), "fresh");
    }

    #[tokio::test]
    async fn test_document_is_not_written_to_cache() {
        let f = fixture().await;
        f.transport.route("/about", 200, "text/html", "about");

        f.engine.handle(get("/about", Some("text/html")), None).await.unwrap();
        f.tasks.settle().await;

        for role in Role::ALL {
            assert_eq!(f.db.count_entries(&f.names.name(role)).await.unwrap(), 0);
        }
    }

    #[tokio::test]
    async fn test_document_server_error_is_returned_verbatim() {
        let f = fixture().await;
        f.transport.route("/broken", 500, "text/html", "oops");

        let outcome = f.engine.handle(get("/broken", Some("text/html")), None).await.unwrap();
        assert_eq!(outcome.source(), Some(ResponseSource::Network));
        assert_eq!(outcome.response().unwrap().status, 500);
    }

    #[tokio::test]
    async fn test_document_offline_serves_offline_page() {
        let f = fixture().await;
        f.db.put_entry(&f.names.name(Role::Static), &get("/offline.html", None), &Response::new(200, "offline body"))
            .await
            .unwrap();
        f.transport.set_offline(true);

        let outcome = f.engine.handle(get("/", Some("text/html")), None).await.unwrap();
        assert_eq!(outcome.source(), Some(ResponseSource::OfflineFallback));
        assert_eq!(outcome.response().unwrap().text(), "offline body");
    }

    #[tokio::test]
    async fn test_document_offline_without_fallback_fails() {
        let f = fixture().await;
        f.transport.set_offline(true);

        let result = f.engine.handle(get("/", Some("text/html")), None).await;
        assert!(matches!(result, Err(Error::MissingFallbackAsset(_))));
    }

    #[tokio::test]
    async fn test_document_abort_falls_back() {
        let f = fixture().await;
        f.db.put_entry(&f.names.name(Role::Static), &get("/offline.html", None), &Response::new(200, "offline"))
            .await
            .unwrap();
        f.transport.hang("/slow");

        let (handle, signal) = abort_pair();
        let engine = f.engine.clone();
        let pending = tokio::spawn(async move { engine.handle(get("/slow", Some("text/html")), Some(signal)).await });
        handle.abort();

        let outcome = pending.await.unwrap().unwrap();
        assert_eq!(outcome.source(), Some(ResponseSource::OfflineFallback));
    }

    #[tokio::test]
    async fn test_image_hit_makes_no_network_call() {
        let f = fixture().await;
        let logo = get("/logo.png", Some("image/png"));
        f.db.put_entry(&f.names.name(Role::Images), &logo, &Response::new(200, "cached png"))
            .await
            .unwrap();

        let outcome = f.engine.handle(logo, None).await.unwrap();
        assert_eq!(outcome.source(), Some(ResponseSource::Cache));
        assert_eq!(outcome.response().unwrap().text(), "cached png");
        assert_eq!(f.transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_image_miss_is_stashed() {
        let f = fixture().await;
        f.transport.route("/logo.png", 200, "image/png", "png");

        let outcome = f.engine.handle(get("/logo.png", Some("image/png")), None).await.unwrap();
        assert_eq!(outcome.source(), Some(ResponseSource::Network));
        assert_eq!(outcome.response().unwrap().text(), "png");

        f.tasks.settle().await;
        let images = PartitionManager::new(Arc::new(f.db.clone())).partition(&f.names.name(Role::Images));
        let stored = images.lookup(&get("/logo.png", None)).await.unwrap().unwrap();
        assert_eq!(stored.text(), "png");
    }

    #[tokio::test]
    async fn test_image_error_status_is_not_stashed() {
        let f = fixture().await;
        f.transport.route("/missing.png", 404, "text/plain", "nope");

        let outcome = f.engine.handle(get("/missing.png", Some("image/png")), None).await.unwrap();
        assert_eq!(outcome.response().unwrap().status, 404);

        f.tasks.settle().await;
        assert_eq!(f.db.count_entries(&f.names.name(Role::Images)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_image_offline_serves_placeholder() {
        let f = fixture().await;
        f.transport.set_offline(true);

        let outcome = f.engine.handle(get("/logo.png", Some("image/png")), None).await.unwrap();
        assert_eq!(outcome.source(), Some(ResponseSource::Placeholder));
        let response = outcome.response().unwrap();
        assert_eq!(response.content_type(), Some("image/svg+xml"));
        assert!(!response.is_storable());
        assert!(response.text().contains("<title>Offline</title>"));
    }

    #[tokio::test]
    async fn test_generic_hit_from_static_partition() {
        let f = fixture().await;
        let css = get("/app.css", Some("text/css"));
        f.db.put_entry(&f.names.name(Role::Static), &css, &Response::new(200, "body{}"))
            .await
            .unwrap();

        let outcome = f.engine.handle(css, None).await.unwrap();
        assert_eq!(outcome.source(), Some(ResponseSource::Cache));
        assert_eq!(f.transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_generic_miss_is_not_stashed() {
        let f = fixture().await;
        f.transport.route("/app.js", 200, "text/javascript", "js");

        let outcome = f.engine.handle(get("/app.js", Some("*/*")), None).await.unwrap();
        assert_eq!(outcome.source(), Some(ResponseSource::Network));

        f.tasks.settle().await;
        for role in Role::ALL {
            assert_eq!(f.db.count_entries(&f.names.name(role)).await.unwrap(), 0);
        }
    }

    #[tokio::test]
    async fn test_generic_offline_fails() {
        let f = fixture().await;
        f.transport.set_offline(true);

        let result = f.engine.handle(get("/app.js", Some("*/*")), None).await;
        assert!(matches!(result, Err(Error::TransportFailure(_))));
    }

    #[tokio::test]
    async fn test_stale_version_entries_are_not_served() {
        let f = fixture().await;
        let logo = get("/logo.png", Some("image/png"));
        f.db.put_entry("v0/acadia/sw/images", &logo, &Response::new(200, "old"))
            .await
            .unwrap();
        f.transport.route("/logo.png", 200, "image/png", "new");

        let outcome = f.engine.handle(logo, None).await.unwrap();
        assert_eq!(outcome.response().unwrap().text(), "new");
    }
}
