//! Storage backend seam.
//!
//! The partition manager only needs list/get/put/delete over named,
//! key-addressed partitions. `CacheDb` is the SQLite implementation.

use async_trait::async_trait;

use super::connection::CacheDb;
use super::entries::CachedEntry;
use crate::Error;
use crate::http::{Request, Response};

/// Named, key-addressed cache partitions.
///
/// Single operations are atomic; sequences of calls are not transactional.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Partition names in creation order.
    async fn partition_names(&self) -> Result<Vec<String>, Error>;

    /// Create the partition if missing. Returns true when it was created.
    async fn create_partition(&self, name: &str) -> Result<bool, Error>;

    /// Delete the partition and its entries. Returns true when it existed.
    async fn delete_partition(&self, name: &str) -> Result<bool, Error>;

    /// Request keys, oldest first.
    async fn keys(&self, partition: &str) -> Result<Vec<String>, Error>;

    async fn get(&self, partition: &str, key: &str) -> Result<Option<CachedEntry>, Error>;

    async fn put(&self, partition: &str, request: &Request, response: &Response) -> Result<(), Error>;

    /// Returns true when an entry was removed.
    async fn delete(&self, partition: &str, key: &str) -> Result<bool, Error>;
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.list_partitions().await
    }

    async fn create_partition(&self, name: &str) -> Result<bool, Error> {
        CacheDb::create_partition(self, name).await
    }

    async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        self.drop_partition(name).await
    }

    async fn keys(&self, partition: &str) -> Result<Vec<String>, Error> {
        self.entry_keys(partition).await
    }

    async fn get(&self, partition: &str, key: &str) -> Result<Option<CachedEntry>, Error> {
        self.get_entry(partition, key).await
    }

    async fn put(&self, partition: &str, request: &Request, response: &Response) -> Result<(), Error> {
        self.put_entry(partition, request, response).await
    }

    async fn delete(&self, partition: &str, key: &str) -> Result<bool, Error> {
        self.delete_entry(partition, key).await
    }
}
