//! # Local Persistent Store
//!
//! Durable key-object store with four named collections, each keyed by a
//! unique string id.
//!
//! ## Overview
//!
//! ```text
//! ┌──────────────┐  put / get / exists   ┌──────────────────────┐
//! │  LocalStore  │──────────────────────▶│ Arc<dyn DatabaseAdapter>
//! └──────┬───────┘                       └──────────┬───────────┘
//!        │ StoreRecord                              │
//!        ▼                                          ▼
//!  audioFiles  songs  setlists  appState      SQLite tables
//! ```
//!
//! Every call is its own transaction. [`LocalStore::clear`] wipes several
//! collections in one transaction.

use std::sync::Arc;

use bridge_traits::database::{DatabaseAdapter, DatabaseConfig, QueryRow, QueryValue};
use bridge_traits::error::BridgeError;
use tracing::{debug, info, instrument, warn};

use crate::adapters::SqliteAdapter;
use crate::error::{LibraryError, Result};
use crate::schema::MIGRATIONS;

// =============================================================================
// Collections
// =============================================================================

/// Named collections of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    AudioFiles,
    Songs,
    Setlists,
    AppState,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::AudioFiles,
        Collection::Songs,
        Collection::Setlists,
        Collection::AppState,
    ];

    /// Collection name as exposed to callers
    pub fn name(self) -> &'static str {
        match self {
            Collection::AudioFiles => "audioFiles",
            Collection::Songs => "songs",
            Collection::Setlists => "setlists",
            Collection::AppState => "appState",
        }
    }

    fn table(self) -> &'static str {
        match self {
            Collection::AudioFiles => "audio_files",
            Collection::Songs => "songs",
            Collection::Setlists => "setlists",
            Collection::AppState => "app_state",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A record type stored in exactly one collection
pub trait StoreRecord: Sized + Send + Sync {
    const COLLECTION: Collection;

    /// Primary key
    fn key(&self) -> &str;

    /// Shape validation run before every write
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Column values, `id` first
    fn to_columns(&self) -> Result<Vec<(&'static str, QueryValue)>>;

    fn from_row(row: &QueryRow) -> Result<Self>;
}

// =============================================================================
// Store
// =============================================================================

/// Handle to the local persistent store
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<dyn DatabaseAdapter>,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore").finish_non_exhaustive()
    }
}

impl LocalStore {
    /// Open a store on an existing adapter, applying pending migrations.
    ///
    /// Idempotent: opening an up-to-date database changes nothing.
    #[instrument(skip(db))]
    pub async fn open(db: Arc<dyn DatabaseAdapter>) -> Result<Self> {
        db.health_check()
            .await
            .map_err(|e| LibraryError::StoreUnavailable(e.to_string()))?;

        let store = Self { db };
        store.migrate().await?;
        Ok(store)
    }

    /// Open (or create) the SQLite database described by `config`.
    pub async fn open_path(config: DatabaseConfig) -> Result<Self> {
        let adapter = SqliteAdapter::new(config).await.map_err(|e| {
            warn!(error = %e, "Failed to open cache database");
            LibraryError::StoreUnavailable(e.to_string())
        })?;
        Self::open(Arc::new(adapter)).await
    }

    async fn migrate(&self) -> Result<()> {
        let current = self
            .db
            .get_schema_version()
            .await
            .map_err(|e| LibraryError::Migration(e.to_string()))?;

        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            info!(
                version = migration.version,
                description = migration.description,
                "Upgrading cache schema"
            );
            self.db
                .apply_migration(migration.version, migration.statements)
                .await
                .map_err(|e| {
                    LibraryError::Migration(format!("version {}: {}", migration.version, e))
                })?;
        }
        Ok(())
    }

    pub async fn schema_version(&self) -> Result<i64> {
        self.db
            .get_schema_version()
            .await
            .map_err(|e| LibraryError::Migration(e.to_string()))
    }

    /// Upsert a record, replacing any previous record with the same key.
    #[instrument(skip(self, record), fields(collection = %R::COLLECTION, key = record.key()))]
    pub async fn put<R: StoreRecord>(&self, record: &R) -> Result<()> {
        record.validate()?;
        let columns = record.to_columns()?;

        let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        let placeholders = vec!["?"; names.len()].join(", ");
        let updates = names
            .iter()
            .filter(|name| **name != "id")
            .map(|name| format!("{name} = excluded.{name}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT(id) DO UPDATE SET {}",
            R::COLLECTION.table(),
            names.join(", "),
            placeholders,
            updates
        );
        let params: Vec<QueryValue> = columns.into_iter().map(|(_, value)| value).collect();

        self.db
            .execute(&sql, &params)
            .await
            .map_err(|e| write_error(R::COLLECTION, record.key(), e))?;

        debug!("Record stored");
        Ok(())
    }

    /// Fetch a record by key. A miss is `Ok(None)`.
    pub async fn get<R: StoreRecord>(&self, key: &str) -> Result<Option<R>> {
        let sql = format!("SELECT * FROM {} WHERE id = ?", R::COLLECTION.table());
        let row = self
            .db
            .query_one_optional(&sql, &[QueryValue::from(key)])
            .await
            .map_err(|e| read_error(R::COLLECTION, e))?;

        row.as_ref().map(R::from_row).transpose()
    }

    /// Presence check without reading the payload
    pub async fn exists(&self, collection: Collection, key: &str) -> Result<bool> {
        let sql = format!(
            "SELECT 1 AS present FROM {} WHERE id = ? LIMIT 1",
            collection.table()
        );
        let row = self
            .db
            .query_one_optional(&sql, &[QueryValue::from(key)])
            .await
            .map_err(|e| read_error(collection, e))?;
        Ok(row.is_some())
    }

    pub async fn count(&self, collection: Collection) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) AS total FROM {}", collection.table());
        self.scalar_u64(collection, &sql, &[]).await
    }

    /// All records of a collection in insertion order
    pub async fn get_all<R: StoreRecord>(&self) -> Result<Vec<R>> {
        let sql = format!("SELECT * FROM {} ORDER BY rowid", R::COLLECTION.table());
        let rows = self
            .db
            .query(&sql, &[])
            .await
            .map_err(|e| read_error(R::COLLECTION, e))?;

        rows.iter().map(R::from_row).collect()
    }

    /// Wipe the given collections in a single transaction.
    #[instrument(skip(self))]
    pub async fn clear(&self, collections: &[Collection]) -> Result<()> {
        let statements: Vec<String> = collections
            .iter()
            .map(|c| format!("DELETE FROM {}", c.table()))
            .collect();
        let no_params: &[QueryValue] = &[];
        let batch: Vec<(&str, &[QueryValue])> = statements
            .iter()
            .map(|sql| (sql.as_str(), no_params))
            .collect();

        let deleted = self.db.execute_batch(&batch).await.map_err(|e| {
            let names: Vec<&str> = collections.iter().map(|c| c.name()).collect();
            LibraryError::WriteError {
                collection: collections.first().map(|c| c.name()).unwrap_or("none"),
                key: names.join(","),
                message: e.to_string(),
            }
        })?;

        info!(rows = deleted.iter().sum::<u64>(), "Collections cleared");
        Ok(())
    }

    /// Sum of `approxSizeBytes` over all cached audio
    pub async fn total_audio_size(&self) -> Result<u64> {
        self.scalar_u64(
            Collection::AudioFiles,
            "SELECT COALESCE(SUM(approx_size_bytes), 0) AS total FROM audio_files",
            &[],
        )
        .await
    }

    /// Cached track ids belonging to `song_id`, via the song index
    pub async fn audio_track_ids_for_song(&self, song_id: &str) -> Result<Vec<String>> {
        let rows = self
            .db
            .query(
                "SELECT id FROM audio_files WHERE song_id = ? ORDER BY id",
                &[QueryValue::from(song_id)],
            )
            .await
            .map_err(|e| read_error(Collection::AudioFiles, e))?;

        Ok(rows
            .iter()
            .filter_map(|row| row.get("id").and_then(QueryValue::as_string))
            .collect())
    }

    pub async fn close(&self) -> Result<()> {
        self.db.close().await?;
        Ok(())
    }

    async fn scalar_u64(
        &self,
        collection: Collection,
        sql: &str,
        params: &[QueryValue],
    ) -> Result<u64> {
        let row = self
            .db
            .query_one_optional(sql, params)
            .await
            .map_err(|e| read_error(collection, e))?;

        Ok(row
            .and_then(|r| r.get("total").and_then(QueryValue::as_i64))
            .unwrap_or(0)
            .max(0) as u64)
    }
}

fn write_error(collection: Collection, key: &str, error: BridgeError) -> LibraryError {
    LibraryError::WriteError {
        collection: collection.name(),
        key: key.to_string(),
        message: error.to_string(),
    }
}

fn read_error(collection: Collection, error: BridgeError) -> LibraryError {
    LibraryError::ReadError {
        collection: collection.name(),
        message: error.to_string(),
    }
}
