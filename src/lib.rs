//! Workspace facade crate.
//!
//! Re-exports the offline cache engine so a host can depend on
//! `stem-cache-workspace` alone. The `desktop-shims` feature wires the
//! reqwest HTTP client, the desktop network monitor and the Firestore
//! catalog.

#[cfg(feature = "core")]
pub use core_service::*;
