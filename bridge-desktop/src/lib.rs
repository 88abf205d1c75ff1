//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop hosts
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`, with retry on 429/5xx
//! - `NetworkMonitor` using a TCP reachability probe
//! - Default on-disk location of the cache database via `dirs`
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{default_database_path, DesktopNetworkMonitor, ReqwestHttpClient};
//!
//! let config = CoreConfig::builder()
//!     .database_path(default_database_path()?)
//!     .http_client(Arc::new(ReqwestHttpClient::new()?))
//!     .network_monitor(Arc::new(DesktopNetworkMonitor::new()))
//!     .build()?;
//! ```

mod http;
mod network;
mod paths;

pub use http::ReqwestHttpClient;
pub use network::DesktopNetworkMonitor;
pub use paths::{default_data_dir, default_database_path, APP_DIR_NAME, DATABASE_FILE_NAME};
