//! # Offline Cache Module
//!
//! Typed facade over the local store for decoded audio, catalog metadata and
//! app state.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │     OfflineCache                       │
//! │  - save_audio_asset()                  │
//! │  - get_audio_asset()                   │
//! │  - get_stats() / clear_all()           │
//! └────────┬───────────────────────────────┘
//!          │
//!          ├──> LocalStore (core-library)
//!          ├──> Clock (cachedAt stamps)
//!          └──> EventBus (optional)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::cache::OfflineCache;
//!
//! let cache = OfflineCache::new(store);
//! if let Some(buffer) = cache.get_audio_asset("song42_1").await {
//!     println!("{} frames", buffer.length());
//! }
//! ```

pub mod facade;
pub mod stats;

pub use facade::{OfflineCache, CONTENT_COLLECTIONS};
pub use stats::CacheStats;
