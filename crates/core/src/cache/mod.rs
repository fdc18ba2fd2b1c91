//! Versioned cache partitions backed by SQLite.
//!
//! This module provides the partition store and its lifecycle:
//!
//! - Named partitions `<version>/<namespace>/<role>`
//! - Entries keyed by a normalized request, kept in insertion order
//! - Automatic schema migrations, WAL mode
//! - Iterative trimming and stale-partition cleanup

pub mod connection;
pub mod entries;
pub mod hash;
pub mod lifecycle;
pub mod migrations;
pub mod partition;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CachedEntry;
pub use lifecycle::{Partition, PartitionManager};
pub use partition::{PartitionNames, Role};
pub use storage::CacheStorage;
