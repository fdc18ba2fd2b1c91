//! Core types and shared functionality for the acadia cache agent.
//!
//! This crate provides:
//! - Request/response representations
//! - Versioned cache partitions with a SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, CacheStorage, Partition, PartitionManager, PartitionNames, Role};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Credentials, Request, Response};
