//! # Cache Database Bootstrap
//!
//! Helpers that open a [`LocalStore`] on SQLite.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_library::db::open_cache_store;
//!
//! let store = open_cache_store("/var/lib/stem-player/offline-cache.db", 5).await?;
//! ```
//!
//! ## Testing
//!
//! ```rust,ignore
//! let store = create_test_store().await;
//! ```

use std::path::Path;

use bridge_traits::database::DatabaseConfig;
use tracing::info;

use crate::error::Result;
use crate::store::LocalStore;

/// Open (creating and migrating when needed) the cache database at `path`.
pub async fn open_cache_store(path: impl AsRef<Path>, max_connections: u32) -> Result<LocalStore> {
    let path = path.as_ref();
    info!(path = %path.display(), "Opening offline cache");

    let config = DatabaseConfig::new(path).with_max_connections(max_connections);
    LocalStore::open_path(config).await
}

/// Fresh, fully migrated in-memory store.
///
/// # Panics
///
/// Panics when SQLite cannot be opened; intended for tests only.
pub async fn create_test_store() -> LocalStore {
    LocalStore::open_path(DatabaseConfig::in_memory())
        .await
        .expect("in-memory store should open")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Collection;

    #[tokio::test]
    async fn test_open_cache_store_creates_file() {
        let dir = std::env::temp_dir().join(format!("cache-store-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("offline-cache.db");

        let store = open_cache_store(&path, 2).await.unwrap();
        assert_eq!(store.count(Collection::Songs).await.unwrap(), 0);
        store.close().await.unwrap();
        assert!(path.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_open_cache_store_reports_unavailable() {
        let result = open_cache_store("/proc/definitely/not/writable/cache.db", 1).await;
        assert!(matches!(
            result,
            Err(crate::LibraryError::StoreUnavailable(_))
        ));
    }
}
