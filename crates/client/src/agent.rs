//! Lifecycle event coordinator.
//!
//! One `CacheAgent` is built per process. It owns the release version tag,
//! the partition manager, and the strategy engine, and reacts to four host
//! events:
//!
//! - **install**: precache the offline fallback set (best effort, detached)
//!   and the mandatory static assets (all or nothing). Success makes the
//!   agent eligible for immediate activation.
//! - **activate**: delete partitions of other releases, then claim clients.
//! - **fetch**: route the request through the strategy engine once clients
//!   are claimed.
//! - **message**: `{"command": "trimCaches"}` trims pages and images in the
//!   background; other commands are ignored.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use url::Url;

use acadia_core::{
    AppConfig, CacheStorage, Credentials, Error, PartitionManager, PartitionNames, Request, Response, Role,
};

use crate::fetch::{Transport, resolve};
use crate::strategy::{AbortSignal, Interception, StrategyEngine};
use crate::tasks::BackgroundTasks;

/// Command that trims the pages and images partitions.
pub const TRIM_CACHES_COMMAND: &str = "trimCaches";

/// Lifecycle of the agent instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Constructed, no install attempted yet.
    Parsed,
    Installing,
    /// Installed and waiting; activation may proceed immediately.
    Installed,
    Activating,
    /// Active and controlling clients.
    Activated,
    /// Install failed; the previous instance stays in control.
    Redundant,
}

/// Control message posted by a client page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMessage {
    #[serde(default)]
    pub command: Option<String>,
}

impl ControlMessage {
    pub fn command(command: impl Into<String>) -> Self {
        Self { command: Some(command.into()) }
    }

    /// Read a message from arbitrary JSON; anything unrecognisable has no command.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let command = value.get("command").and_then(|c| c.as_str()).map(str::to_string);
        Self { command }
    }
}

/// A fetch event carrying the intercepted request.
pub struct FetchEvent {
    pub request: Request,
    pub abort: Option<AbortSignal>,
}

impl FetchEvent {
    pub fn new(request: Request) -> Self {
        Self { request, abort: None }
    }

    pub fn with_abort(mut self, abort: AbortSignal) -> Self {
        self.abort = Some(abort);
        self
    }
}

pub enum AgentEvent {
    Install,
    Activate,
    Fetch(FetchEvent),
    Message(ControlMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageOutcome {
    TrimScheduled,
    Ignored,
}

#[derive(Debug)]
pub enum EventOutcome {
    Installed { precached: usize },
    Activated { stale_deleted: usize },
    Fetch(Interception),
    Message(MessageOutcome),
}

/// Settings the agent needs from the application configuration.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub version_tag: String,
    pub namespace: String,
    pub origin: Url,
    pub offline_page: String,
    pub offline_pages: Vec<String>,
    pub static_assets: Vec<String>,
    pub pages_max_entries: usize,
    pub images_max_entries: usize,
}

impl AgentSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        Ok(Self {
            version_tag: config.version_tag.clone(),
            namespace: config.namespace.clone(),
            origin,
            offline_page: config.offline_page.clone(),
            offline_pages: config.offline_pages.clone(),
            static_assets: config.static_assets.clone(),
            pages_max_entries: config.pages_max_entries,
            images_max_entries: config.images_max_entries,
        })
    }
}

/// The background cache agent.
pub struct CacheAgent {
    settings: AgentSettings,
    names: PartitionNames,
    partitions: PartitionManager,
    transport: Arc<dyn Transport>,
    engine: StrategyEngine,
    tasks: BackgroundTasks,
    state: RwLock<LifecycleState>,
}

impl CacheAgent {
    pub fn new(
        settings: AgentSettings, storage: Arc<dyn CacheStorage>, transport: Arc<dyn Transport>,
    ) -> Result<Self, Error> {
        let names = PartitionNames::new(settings.version_tag.clone(), settings.namespace.clone());
        let partitions = PartitionManager::new(storage);
        let tasks = BackgroundTasks::new();
        let offline_request = asset_request(&settings.origin, &settings.offline_page)?;
        let engine = StrategyEngine::new(
            Arc::clone(&transport),
            partitions.clone(),
            names.clone(),
            offline_request,
            tasks.clone(),
        );

        Ok(Self { settings, names, partitions, transport, engine, tasks, state: RwLock::new(LifecycleState::Parsed) })
    }

    pub fn from_config(
        config: &AppConfig, storage: Arc<dyn CacheStorage>, transport: Arc<dyn Transport>,
    ) -> Result<Self, Error> {
        Self::new(AgentSettings::from_config(config)?, storage, transport)
    }

    pub fn version_tag(&self) -> &str {
        self.names.version_tag()
    }

    pub fn partition_name(&self, role: Role) -> String {
        self.names.name(role)
    }

    pub fn partitions(&self) -> &PartitionManager {
        &self.partitions
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    /// Wait for every detached cache write and trim to finish.
    pub async fn settle(&self) {
        self.tasks.settle().await;
    }

    /// Event-kind to handler table.
    pub async fn dispatch(&self, event: AgentEvent) -> Result<EventOutcome, Error> {
        match event {
            AgentEvent::Install => self.install().await.map(|precached| EventOutcome::Installed { precached }),
            AgentEvent::Activate => self
                .activate()
                .await
                .map(|stale_deleted| EventOutcome::Activated { stale_deleted }),
            AgentEvent::Fetch(event) => self.fetch(event).await.map(EventOutcome::Fetch),
            AgentEvent::Message(message) => Ok(EventOutcome::Message(self.message(&message))),
        }
    }

    /// Install fully, then activate.
    pub async fn start(&self) -> Result<usize, Error> {
        self.install().await?;
        self.activate().await
    }

    /// Handle the install event.
    ///
    /// Returns the number of mandatory assets cached.
    pub async fn install(&self) -> Result<usize, Error> {
        {
            let mut state = self.state.write().await;
            if *state != LifecycleState::Parsed {
                return Err(Error::InvalidState(format!("cannot install from {:?}", *state)));
            }
            *state = LifecycleState::Installing;
        }
        tracing::info!(version = self.version_tag(), "installing");

        self.precache_offline_pages();

        match self.precache_static_assets().await {
            Ok(count) => {
                *self.state.write().await = LifecycleState::Installed;
                tracing::info!(version = self.version_tag(), precached = count, "installed, skipping wait");
                Ok(count)
            }
            Err(e) => {
                *self.state.write().await = LifecycleState::Redundant;
                tracing::warn!(version = self.version_tag(), error = %e, "install failed");
                Err(e)
            }
        }
    }

    /// Handle the activate event.
    ///
    /// Stale partitions are fully deleted before clients are claimed.
    /// Returns the number of partitions deleted.
    pub async fn activate(&self) -> Result<usize, Error> {
        {
            let mut state = self.state.write().await;
            if *state != LifecycleState::Installed {
                return Err(Error::InvalidState(format!("cannot activate from {:?}", *state)));
            }
            *state = LifecycleState::Activating;
        }

        let deleted = match self.partitions.clear_stale(self.version_tag()).await {
            Ok(deleted) => deleted,
            Err(e) => {
                *self.state.write().await = LifecycleState::Installed;
                return Err(e);
            }
        };

        *self.state.write().await = LifecycleState::Activated;
        tracing::info!(version = self.version_tag(), stale_deleted = deleted, "activated, clients claimed");
        Ok(deleted)
    }

    /// Handle a fetch event.
    ///
    /// Requests reach the engine only once this instance controls clients.
    pub async fn fetch(&self, event: FetchEvent) -> Result<Interception, Error> {
        if self.state().await != LifecycleState::Activated {
            return Ok(Interception::NotIntercepted);
        }
        self.engine.handle(event.request, event.abort).await
    }

    /// Handle a control message without waiting for any work it starts.
    pub fn message(&self, message: &ControlMessage) -> MessageOutcome {
        match message.command.as_deref() {
            Some(TRIM_CACHES_COMMAND) => {
                self.schedule_trim(Role::Pages, self.settings.pages_max_entries);
                self.schedule_trim(Role::Images, self.settings.images_max_entries);
                MessageOutcome::TrimScheduled
            }
            other => {
                tracing::debug!(command = ?other, "ignoring control message");
                MessageOutcome::Ignored
            }
        }
    }

    fn schedule_trim(&self, role: Role, max_entries: usize) {
        let partitions = self.partitions.clone();
        let name = self.names.name(role);
        self.tasks.spawn(async move {
            if let Err(e) = partitions.trim(&name, max_entries).await {
                tracing::warn!(partition = %name, error = %e, "trim failed");
            }
        });
    }

    /// Cache the offline fallback set in the background, item by item.
    fn precache_offline_pages(&self) {
        let requests: Vec<Request> = self
            .settings
            .offline_pages
            .iter()
            .filter_map(|page| match asset_request(&self.settings.origin, page) {
                Ok(request) => Some(request),
                Err(e) => {
                    tracing::warn!(page = %page, error = %e, "skipping offline page");
                    None
                }
            })
            .collect();

        let transport = Arc::clone(&self.transport);
        let partitions = self.partitions.clone();
        let name = self.names.name(Role::Static);
        self.tasks.spawn(async move {
            let partition = match partitions.open(&name).await {
                Ok(partition) => partition,
                Err(e) => {
                    tracing::warn!(partition = %name, error = %e, "cannot open static partition");
                    return;
                }
            };
            for request in requests {
                let result = match transport.fetch(&request).await {
                    Ok(response) if response.is_success() => partition.put(&request, &response).await,
                    Ok(response) => Err(Error::TransportFailure(format!("status {}", response.status))),
                    Err(e) => Err(e.into()),
                };
                match result {
                    Ok(()) => tracing::debug!(url = %request.url, "cached offline page"),
                    Err(e) => tracing::warn!(url = %request.url, error = %e, "failed to cache offline page"),
                }
            }
        });
    }

    /// Fetch every mandatory asset, then write them all.
    ///
    /// Any failed fetch or non-2xx status aborts the batch before anything
    /// is written.
    async fn precache_static_assets(&self) -> Result<usize, Error> {
        let requests = self
            .settings
            .static_assets
            .iter()
            .map(|asset| asset_request(&self.settings.origin, asset))
            .collect::<Result<Vec<_>, _>>()?;

        let mut join_set = JoinSet::new();
        for (index, request) in requests.into_iter().enumerate() {
            let transport = Arc::clone(&self.transport);
            join_set.spawn(async move {
                let result = transport.fetch(&request).await;
                (index, request, result)
            });
        }

        let mut fetched: Vec<(usize, Request, Response)> = Vec::with_capacity(join_set.len());
        while let Some(joined) = join_set.join_next().await {
            let (index, request, result) =
                joined.map_err(|e| Error::InstallFailed(format!("precache task failed: {e}")))?;
            let response = result.map_err(|e| Error::InstallFailed(format!("{}: {e}", request.url)))?;
            if !response.is_success() {
                return Err(Error::InstallFailed(format!("{}: status {}", request.url, response.status)));
            }
            fetched.push((index, request, response));
        }
        fetched.sort_by_key(|(index, _, _)| *index);

        let partition = self.partitions.open(&self.names.name(Role::Static)).await?;
        for (_, request, response) in &fetched {
            partition.put(request, response).await?;
        }

        Ok(fetched.len())
    }
}

/// Precache request for a configured path, credentials included.
fn asset_request(origin: &Url, path: &str) -> Result<Request, Error> {
    let url = resolve(origin, path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))?;
    Ok(Request::get(url).with_credentials(Credentials::Include))
}
