//! # Offline Cache Store
//!
//! Owns the local persistent store behind the offline-first player.
//!
//! ## Overview
//!
//! This crate manages:
//! - SQLite schema and additive, versioned migrations
//! - The four cache collections: `audioFiles`, `songs`, `setlists`, `appState`
//! - Validated record types with bit-exact sample storage

pub mod adapters;
pub mod db;
pub mod error;
pub mod models;
pub mod schema;
pub mod store;

pub use adapters::SqliteAdapter;
pub use db::{create_test_store, open_cache_store};
pub use error::{LibraryError, Result};
pub use models::{
    format_timestamp, track_id_for, AppStateEntry, CachedAudioAsset, CachedSetlistMetadata,
    CachedSongMetadata, ChannelSamples, TrackRef, LAST_APP_STATE_KEY, SYNC_STATUS_KEY,
};
pub use store::{Collection, LocalStore, StoreRecord};
