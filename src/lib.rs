//! Offline-first request caching layer with versioned cache namespaces.
//!
//! Sits between a client application and the network and decides, per
//! request, whether to serve from the local store, fetch fresh, or refuse
//! to cache at all. Previously fetched pages and assets keep working when
//! connectivity is absent; sensitive or mutating requests are never
//! persisted.
//!
//! # Example
//!
//! ```ignore
//! use offcache::{Request, SqliteStore, Worker, WorkerConfig};
//!
//! let config = WorkerConfig::load(None)?;
//! let worker = Worker::with_defaults(config)?;
//!
//! worker.on_install().await?;
//! worker.on_activate().await?;
//!
//! let request = Request::get("https://app.example/dashboard")?;
//! let response = worker.on_fetch(&request).await?;
//! ```

pub mod classify;
pub mod commands;
pub mod config;
pub mod fallback;
pub mod fetch;
pub mod http;
pub mod lifecycle;
pub mod store;
pub mod strategy;
pub mod worker;

pub use classify::{Classification, Classifier};
pub use commands::Command;
pub use config::WorkerConfig;
pub use fallback::OfflineFallback;
pub use fetch::{Fetcher, HttpFetcher};
pub use http::{Destination, Method, Request, RequestKey, Response};
pub use lifecycle::{LifecycleManager, LifecycleState};
pub use store::{CachedResponse, MemoryStore, NamespaceStore, SqliteStore};
pub use strategy::StrategyExecutor;
pub use worker::{Worker, WorkerEvent};
