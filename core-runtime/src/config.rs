//! # Core Configuration Module
//!
//! Configuration for the offline cache engine.
//!
//! ## Overview
//!
//! A builder constructs a [`CoreConfig`] holding every injected capability
//! and tuning knob. Validation is fail-fast: a missing required capability
//! produces [`Error::CapabilityMissing`] with an actionable message.
//!
//! ## Required Dependencies
//!
//! - `RemoteCatalog` - Source of song and setlist documents
//! - `HttpClient` - Audio blob downloads (desktop default: reqwest)
//!
//! ## Optional Dependencies
//!
//! - `NetworkMonitor` - Connectivity detection (desktop default: TCP probe)
//! - `Clock` - Time source (default: system clock)
//!
//! When the `desktop-shims` feature is enabled, desktop defaults for
//! `HttpClient` and `NetworkMonitor` are injected if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/data/offline-cache.db")
//!     .remote_catalog(Arc::new(FirestoreCatalog::new(http.clone(), "my-project")))
//!     .http_client(http)
//!     .max_concurrent_downloads(6)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{Clock, HttpClient, NetworkMonitor, RemoteCatalog, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::events::DEFAULT_EVENT_BUFFER_SIZE;

/// Default number of audio downloads in flight during a sync
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 4;

/// Default per-download timeout
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 120;

const MAX_CONCURRENT_DOWNLOADS_LIMIT: usize = 32;

/// Core configuration for the offline cache engine.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite cache database
    pub database_path: PathBuf,

    /// Maximum pooled database connections
    pub database_max_connections: u32,

    /// HTTP client for audio blob downloads
    pub http_client: Arc<dyn HttpClient>,

    /// Remote document catalog (required)
    pub remote_catalog: Arc<dyn RemoteCatalog>,

    /// Network connectivity monitor (optional)
    pub network_monitor: Option<Arc<dyn NetworkMonitor>>,

    /// Time source for cache timestamps
    pub clock: Arc<dyn Clock>,

    /// Audio downloads allowed in flight during sync
    pub max_concurrent_downloads: usize,

    /// Timeout applied to each audio download
    pub download_timeout_secs: u64,

    /// Capacity of the event bus channel
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("database_max_connections", &self.database_max_connections)
            .field("http_client", &"HttpClient { ... }")
            .field("remote_catalog", &"RemoteCatalog { ... }")
            .field(
                "network_monitor",
                &self
                    .network_monitor
                    .as_ref()
                    .map(|_| "NetworkMonitor { ... }"),
            )
            .field("max_concurrent_downloads", &self.max_concurrent_downloads)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.database_max_connections == 0 {
            return Err(Error::Config(
                "Database connection limit must be at least 1".to_string(),
            ));
        }

        if self.max_concurrent_downloads == 0 {
            return Err(Error::Config(
                "Concurrent downloads must be at least 1".to_string(),
            ));
        }

        if self.max_concurrent_downloads > MAX_CONCURRENT_DOWNLOADS_LIMIT {
            return Err(Error::Config(format!(
                "Concurrent downloads exceeds maximum of {}",
                MAX_CONCURRENT_DOWNLOADS_LIMIT
            )));
        }

        if self.download_timeout_secs == 0 {
            return Err(Error::Config(
                "Download timeout must be greater than 0 seconds".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn remote_catalog_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "RemoteCatalog".to_string(),
        message: "A RemoteCatalog implementation is required to sync songs and setlists. \
                 Inject one with CoreConfigBuilder::remote_catalog() \
                 (e.g. provider_firestore::FirestoreCatalog)."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new().map_err(|e| Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: format!("Default desktop HTTP client could not be created: {}", e),
    })?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to download audio. \
                 Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                 Mobile: inject a platform-native HTTP adapter."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_network_monitor() -> Option<Arc<dyn NetworkMonitor>> {
    Some(Arc::new(bridge_desktop::DesktopNetworkMonitor::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_network_monitor() -> Option<Arc<dyn NetworkMonitor>> {
    None
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    database_max_connections: Option<u32>,
    http_client: Option<Arc<dyn HttpClient>>,
    remote_catalog: Option<Arc<dyn RemoteCatalog>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    clock: Option<Arc<dyn Clock>>,
    max_concurrent_downloads: Option<usize>,
    download_timeout_secs: Option<u64>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the database path.
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder().database_path("/data/offline-cache.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn database_max_connections(mut self, max: u32) -> Self {
        self.database_max_connections = Some(max);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the remote catalog implementation (required).
    pub fn remote_catalog(mut self, catalog: Arc<dyn RemoteCatalog>) -> Self {
        self.remote_catalog = Some(catalog);
        self
    }

    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn max_concurrent_downloads(mut self, max: usize) -> Self {
        self.max_concurrent_downloads = Some(max);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.download_timeout_secs = Some(secs);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Fails when the database path or a required capability is missing,
    /// or when a value is out of range.
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let remote_catalog = self
            .remote_catalog
            .ok_or_else(remote_catalog_missing_error)?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let config = CoreConfig {
            database_path,
            database_max_connections: self.database_max_connections.unwrap_or(5),
            http_client,
            remote_catalog,
            network_monitor: self
                .network_monitor
                .or_else(provide_default_network_monitor),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            max_concurrent_downloads: self
                .max_concurrent_downloads
                .unwrap_or(DEFAULT_MAX_CONCURRENT_DOWNLOADS),
            download_timeout_secs: self
                .download_timeout_secs
                .unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
