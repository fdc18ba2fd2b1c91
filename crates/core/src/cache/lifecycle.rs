//! Partition lifecycle: open, trim, and stale-release cleanup.

use std::sync::Arc;

use super::hash::request_key;
use super::partition::belongs_to;
use super::storage::CacheStorage;
use crate::Error;
use crate::http::{Request, Response};

/// Handle to one named partition.
///
/// Holds no entries itself; every call goes to the storage backend.
#[derive(Clone)]
pub struct Partition {
    name: String,
    storage: Arc<dyn CacheStorage>,
}

impl Partition {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stored response for a request, if any.
    pub async fn lookup(&self, request: &Request) -> Result<Option<Response>, Error> {
        let entry = self.storage.get(&self.name, &request_key(request)).await?;
        Ok(entry.map(|e| e.response))
    }

    pub async fn contains(&self, request: &Request) -> Result<bool, Error> {
        Ok(self.storage.get(&self.name, &request_key(request)).await?.is_some())
    }

    /// Store a response, replacing any entry under the same request key.
    pub async fn put(&self, request: &Request, response: &Response) -> Result<(), Error> {
        self.storage.put(&self.name, request, response).await
    }

    pub async fn delete(&self, request: &Request) -> Result<bool, Error> {
        self.storage.delete(&self.name, &request_key(request)).await
    }

    /// Request keys, oldest first.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        self.storage.keys(&self.name).await
    }

    pub async fn len(&self) -> Result<usize, Error> {
        Ok(self.keys().await?.len())
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }
}

/// Creates, bounds, and retires partitions.
#[derive(Clone)]
pub struct PartitionManager {
    storage: Arc<dyn CacheStorage>,
}

impl PartitionManager {
    pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
        Self { storage }
    }

    /// Open a partition, creating it empty if it does not exist.
    ///
    /// Storage errors propagate unchanged; nothing is retried.
    pub async fn open(&self, name: &str) -> Result<Partition, Error> {
        if self.storage.create_partition(name).await? {
            tracing::debug!(partition = name, "created partition");
        }
        Ok(self.partition(name))
    }

    /// Handle to a partition without creating it; reads of a missing
    /// partition see no entries.
    pub fn partition(&self, name: &str) -> Partition {
        Partition { name: name.to_string(), storage: Arc::clone(&self.storage) }
    }

    pub async fn names(&self) -> Result<Vec<String>, Error> {
        self.storage.partition_names().await
    }

    /// Delete oldest entries until at most `max_entries` remain.
    ///
    /// One entry is removed per iteration and the keys are re-read, so
    /// entries written concurrently are accounted for. An iteration whose
    /// delete removed nothing and whose count did not drop ends the loop.
    ///
    /// Returns the number of entries this call deleted.
    pub async fn trim(&self, name: &str, max_entries: usize) -> Result<usize, Error> {
        let partition = self.open(name).await?;
        let mut keys = partition.keys().await?;
        let mut removed = 0;

        while keys.len() > max_entries {
            let before = keys.len();
            let deleted = self.storage.delete(name, &keys[0]).await?;
            if deleted {
                removed += 1;
            }
            keys = partition.keys().await?;

            if !deleted && keys.len() >= before {
                tracing::warn!(partition = name, entries = keys.len(), max_entries, "trim made no progress, stopping");
                break;
            }
        }

        if removed > 0 {
            tracing::debug!(partition = name, removed, remaining = keys.len(), "trimmed partition");
        }
        Ok(removed)
    }

    /// Delete every partition that does not belong to `version_tag`.
    ///
    /// A partition belongs to the release only when its name starts with
    /// `"{version_tag}/"`. With tag `v1`, `v10/acadia/sw/pages` is stale and
    /// gets deleted.
    ///
    /// Returns the number of partitions deleted.
    pub async fn clear_stale(&self, version_tag: &str) -> Result<usize, Error> {
        let mut deleted = 0;
        for name in self.storage.partition_names().await? {
            if belongs_to(&name, version_tag) {
                continue;
            }
            if self.storage.delete_partition(&name).await? {
                tracing::info!(partition = %name, "deleted stale partition");
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}
