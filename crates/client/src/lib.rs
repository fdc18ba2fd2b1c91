//! Request interception for acadia-sw.
//!
//! This crate provides the network transport, request classification, the
//! per-class caching strategies, and the lifecycle coordinator built on the
//! partition store from `acadia-core`.

pub mod agent;
pub mod classify;
pub mod fetch;
pub mod strategy;
pub mod tasks;

#[cfg(test)]
mod testing;

pub use agent::{
    AgentEvent, AgentSettings, CacheAgent, ControlMessage, EventOutcome, FetchEvent, LifecycleState, MessageOutcome,
    TRIM_CACHES_COMMAND,
};
pub use classify::{RequestClass, Strategy, classify};
pub use fetch::{FetchConfig, HttpTransport, Transport, TransportError, UrlError, resolve};
pub use strategy::{
    AbortHandle, AbortSignal, Interception, OFFLINE_IMAGE_SVG, ResponseSource, StrategyEngine, abort_pair,
    offline_image,
};
pub use tasks::BackgroundTasks;
