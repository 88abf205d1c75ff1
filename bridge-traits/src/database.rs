//! Database Abstraction Layer
//!
//! Provides a backend-agnostic trait for the relational operations the local
//! cache needs. The native implementation is SQLite via sqlx (see
//! `core_library::adapters::SqliteAdapter`).
//!
//! ## Design
//!
//! The local store only needs three shapes of work:
//!
//! - single statements (`execute`, `query`, `query_one_optional`), each
//!   running in its own implicit transaction
//! - atomic multi-statement batches (`execute_batch`), used to wipe several
//!   collections at once
//! - versioned schema migrations (`apply_migration`), where the migration
//!   statements and the version record commit together
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_traits::database::{DatabaseAdapter, DatabaseConfig, QueryValue};
//!
//! let adapter = SqliteAdapter::new(DatabaseConfig::new("cache.db")).await?;
//! let rows = adapter
//!     .query("SELECT id FROM songs WHERE name = ?", &[QueryValue::Text("Intro".into())])
//!     .await?;
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database file path or connection string
    pub database_url: String,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,

    /// Statement cache capacity per connection
    pub cache_capacity: usize,
}

impl DatabaseConfig {
    /// Create a new database configuration with the given file path
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let path = database_path.into();
        let database_url = format!("sqlite:{}", path.display());

        Self {
            database_url,
            min_connections: 1,
            max_connections: 5,
            acquire_timeout_secs: 30,
            cache_capacity: 100,
        }
    }

    /// Create a configuration for an in-memory database.
    ///
    /// Every pooled connection to `sqlite::memory:` sees its own database,
    /// so the pool is pinned to a single connection.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            min_connections: 1,
            max_connections: 1,
            acquire_timeout_secs: 30,
            cache_capacity: 100,
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self.min_connections = self.min_connections.min(self.max_connections);
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:")
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

// =============================================================================
// Query Result Types
// =============================================================================

/// Represents a single row from a database query as a map of column names to values
pub type QueryRow = std::collections::HashMap<String, QueryValue>;

/// Represents a database value that can be null, integer, real, text, or blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl QueryValue {
    /// Convert to i64 if possible
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            QueryValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Convert to f64 if possible
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            QueryValue::Real(r) => Some(*r),
            QueryValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            QueryValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<String> {
        self.as_str().map(str::to_string)
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            QueryValue::Blob(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, QueryValue::Null)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Integer(value)
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Real(value)
    }
}

impl From<Vec<u8>> for QueryValue {
    fn from(value: Vec<u8>) -> Self {
        QueryValue::Blob(value)
    }
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(QueryValue::Null)
    }
}

// =============================================================================
// Database Adapter Trait
// =============================================================================

/// Database adapter trait
///
/// ## Error Handling
///
/// All methods return `Result<T>` using [`BridgeError`](crate::BridgeError).
/// Uniqueness and key violations are reported as
/// [`BridgeError::ConstraintViolation`](crate::BridgeError::ConstraintViolation)
/// so callers can tell them apart from I/O failures.
#[async_trait::async_trait]
pub trait DatabaseAdapter: Send + Sync {
    // =========================================================================
    // Connection Management
    // =========================================================================

    /// Check if the database connection is healthy
    async fn health_check(&self) -> Result<()>;

    /// Close all database connections
    async fn close(&self) -> Result<()>;

    // =========================================================================
    // Raw Query Execution
    // =========================================================================

    /// Execute a SQL query and return rows
    ///
    /// Implementations must bind `params` positionally; never concatenate
    /// caller input into the query string.
    async fn query(&self, query: &str, params: &[QueryValue]) -> Result<Vec<QueryRow>>;

    /// Execute a SQL statement that doesn't return rows (INSERT, UPDATE, DELETE)
    ///
    /// Returns the number of rows affected.
    async fn execute(&self, statement: &str, params: &[QueryValue]) -> Result<u64>;

    /// Execute a query and return a single optional row
    async fn query_one_optional(
        &self,
        query: &str,
        params: &[QueryValue],
    ) -> Result<Option<QueryRow>>;

    // =========================================================================
    // Batch Operations
    // =========================================================================

    /// Execute multiple statements in one transaction.
    ///
    /// Either every statement commits or none does. Returns one row count per
    /// statement.
    async fn execute_batch(&self, statements: &[(&str, &[QueryValue])]) -> Result<Vec<u64>>;

    // =========================================================================
    // Migration Support
    // =========================================================================

    /// Highest applied schema version, `0` for a fresh database
    async fn get_schema_version(&self) -> Result<i64>;

    /// Apply a migration's statements and record `version`, atomically
    async fn apply_migration(&self, version: i64, statements: &[&str]) -> Result<()>;
}
