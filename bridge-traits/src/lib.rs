//! # Host Bridge Traits
//!
//! Capability traits the offline cache engine requires from its host.
//!
//! ## Overview
//!
//! This crate defines the contract between the core crates and
//! host-specific implementations. Each trait is a capability that the core
//! needs but that is provided differently per host (desktop, mobile shell,
//! tests).
//!
//! ## Traits
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Async HTTP for catalog and audio blob fetches
//! - [`RemoteCatalog`](catalog::RemoteCatalog) - Read-only document catalog (songs, setlists)
//! - [`NetworkMonitor`](network::NetworkMonitor) - Connectivity detection
//!
//! ### Storage
//! - [`DatabaseAdapter`](database::DatabaseAdapter) - Relational backend for the local store
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Host Implementations
//!
//! | Host    | Implementation Crate | Provides |
//! |---------|----------------------|----------|
//! | Desktop | `bridge-desktop`     | `HttpClient`, `NetworkMonitor` |
//! | Any     | `core-library`       | `DatabaseAdapter` (SQLite) |
//! | Any     | `provider-firestore` | `RemoteCatalog` |
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability
//! is missing:
//!
//! ```ignore
//! let catalog = config.remote_catalog.clone().ok_or_else(|| Error::CapabilityMissing {
//!     capability: "RemoteCatalog".to_string(),
//!     message: "No remote catalog provided. Inject a RemoteCatalog implementation \
//!               (e.g. provider-firestore) via CoreConfigBuilder::remote_catalog()."
//!         .to_string(),
//! })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert backend errors to `BridgeError` with actionable messages.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! across async tasks behind `Arc<dyn Trait>`.

pub mod catalog;
pub mod database;
pub mod error;
pub mod http;
pub mod network;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use catalog::{CatalogDocument, RemoteCatalog};
pub use database::{DatabaseAdapter, DatabaseConfig, QueryRow, QueryValue};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use network::{NetworkChangeStream, NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType};
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
