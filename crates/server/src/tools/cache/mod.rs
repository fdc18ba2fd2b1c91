//! Cache-related MCP tools.
//!
//! These read and trim the current release's partitions directly.

pub mod get;
pub mod purge;

pub use get::{CacheGetParams, get_impl};
pub use purge::{CachePurgeParams, purge_impl};
