//! Native SQLite Database Adapter
//!
//! Implements the `DatabaseAdapter` trait using `sqlx` with the native SQLite driver.
//!
//! ## Features
//!
//! - Connection pooling with configurable limits
//! - WAL mode for concurrent readers during audio writes
//! - Atomic batches and migrations on a dedicated pooled transaction
//! - Prepared statement caching
//! - Constraint violations surfaced as [`BridgeError::ConstraintViolation`]

use async_trait::async_trait;
use bridge_traits::database::{
    DatabaseAdapter, DatabaseConfig, QueryRow, QueryValue,
};
use bridge_traits::error::{BridgeError, Result};
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{Column, Pool, Row, Sqlite};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

const CREATE_MIGRATIONS_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
)";

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Native SQLite implementation of DatabaseAdapter
pub struct SqliteAdapter {
    pool: Pool<Sqlite>,
}

impl SqliteAdapter {
    /// Open the connection pool and prepare the migration ledger.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::DatabaseError`] when the URL is invalid or the
    /// database cannot be opened.
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        info!(
            database_url = %config.database_url,
            min_connections = config.min_connections,
            max_connections = config.max_connections,
            "Creating SQLite database adapter"
        );

        let connect_options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| BridgeError::DatabaseError(format!("Invalid database URL: {}", e)))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .create_if_missing(true)
            // 64MB page cache
            .pragma("cache_size", "-64000")
            .pragma("auto_vacuum", "INCREMENTAL")
            .busy_timeout(Duration::from_secs(10))
            .statement_cache_capacity(config.cache_capacity);

        let mut pool_options = SqlitePoolOptions::new();
        if config.is_in_memory() {
            // Each connection to `:memory:` is a separate database.
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(connect_options)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to create connection pool");
                BridgeError::DatabaseError(format!("Connection pool creation failed: {}", e))
            })?;

        let adapter = Self::from_pool(pool);
        adapter.execute(CREATE_MIGRATIONS_TABLE, &[]).await?;

        info!(
            connections = adapter.pool.size(),
            "SQLite connection pool created successfully"
        );

        Ok(adapter)
    }

    /// Wrap an existing pool. The migration ledger is created on first use.
    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    fn row_to_query_row(row: &SqliteRow) -> QueryRow {
        let mut result = HashMap::new();

        for column in row.columns() {
            let ordinal = column.ordinal();
            let value = if let Ok(v) = row.try_get::<Option<i64>, _>(ordinal) {
                v.map(QueryValue::Integer).unwrap_or(QueryValue::Null)
            } else if let Ok(v) = row.try_get::<Option<f64>, _>(ordinal) {
                v.map(QueryValue::Real).unwrap_or(QueryValue::Null)
            } else if let Ok(v) = row.try_get::<Option<String>, _>(ordinal) {
                v.map(QueryValue::Text).unwrap_or(QueryValue::Null)
            } else if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(ordinal) {
                v.map(QueryValue::Blob).unwrap_or(QueryValue::Null)
            } else {
                QueryValue::Null
            };

            result.insert(column.name().to_string(), value);
        }

        result
    }

    fn bind_params<'q>(mut query: SqliteQuery<'q>, params: &'q [QueryValue]) -> SqliteQuery<'q> {
        for param in params {
            query = match param {
                QueryValue::Null => query.bind(None::<i64>),
                QueryValue::Integer(i) => query.bind(*i),
                QueryValue::Real(r) => query.bind(*r),
                QueryValue::Text(s) => query.bind(s.as_str()),
                QueryValue::Blob(b) => query.bind(b.as_slice()),
            };
        }
        query
    }

    /// Map a sqlx error, keeping constraint violations distinguishable.
    fn map_error(context: &str, error: sqlx::Error) -> BridgeError {
        if let sqlx::Error::Database(db_error) = &error {
            if db_error.is_unique_violation()
                || db_error.is_foreign_key_violation()
                || db_error.is_check_violation()
            {
                return BridgeError::ConstraintViolation(db_error.message().to_string());
            }
        }
        BridgeError::DatabaseError(format!("{}: {}", context, error))
    }
}

#[async_trait]
impl DatabaseAdapter for SqliteAdapter {
    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Database health check failed");
                Self::map_error("Health check failed", e)
            })?;

        debug!("Database health check passed");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        info!("Closing database connection pool");
        self.pool.close().await;
        Ok(())
    }

    async fn query(&self, query: &str, params: &[QueryValue]) -> Result<Vec<QueryRow>> {
        debug!(query = %query, param_count = params.len(), "Executing query");

        let rows = Self::bind_params(sqlx::query(query), params)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Self::map_error("Query failed", e))?;

        Ok(rows.iter().map(Self::row_to_query_row).collect())
    }

    async fn execute(&self, statement: &str, params: &[QueryValue]) -> Result<u64> {
        debug!(statement = %statement, param_count = params.len(), "Executing statement");

        let result = Self::bind_params(sqlx::query(statement), params)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_error("Execute failed", e))?;

        Ok(result.rows_affected())
    }

    async fn query_one_optional(
        &self,
        query: &str,
        params: &[QueryValue],
    ) -> Result<Option<QueryRow>> {
        let row = Self::bind_params(sqlx::query(query), params)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::map_error("Query one optional failed", e))?;

        Ok(row.as_ref().map(Self::row_to_query_row))
    }

    async fn execute_batch(&self, statements: &[(&str, &[QueryValue])]) -> Result<Vec<u64>> {
        debug!(batch_size = statements.len(), "Executing batch");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Self::map_error("Begin transaction failed", e))?;

        let mut results = Vec::with_capacity(statements.len());
        for (statement, params) in statements {
            // Dropping `tx` on error rolls the batch back.
            let result = Self::bind_params(sqlx::query(statement), params)
                .execute(&mut *tx)
                .await
                .map_err(|e| Self::map_error("Batch statement failed", e))?;
            results.push(result.rows_affected());
        }

        tx.commit()
            .await
            .map_err(|e| Self::map_error("Commit failed", e))?;

        debug!(results = ?results, "Batch committed");
        Ok(results)
    }

    async fn get_schema_version(&self) -> Result<i64> {
        self.execute(CREATE_MIGRATIONS_TABLE, &[]).await?;

        let row = self
            .query_one_optional(
                "SELECT COALESCE(MAX(version), 0) AS version FROM schema_migrations",
                &[],
            )
            .await?;

        row.and_then(|r| r.get("version").and_then(QueryValue::as_i64))
            .ok_or_else(|| BridgeError::DatabaseError("Failed to read schema version".to_string()))
    }

    async fn apply_migration(&self, version: i64, statements: &[&str]) -> Result<()> {
        info!(version, "Applying migration");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Self::map_error("Begin transaction failed", e))?;

        sqlx::query(CREATE_MIGRATIONS_TABLE)
            .execute(&mut *tx)
            .await
            .map_err(|e| Self::map_error("Migration ledger failed", e))?;

        for statement in statements {
            sqlx::query(statement).execute(&mut *tx).await.map_err(|e| {
                warn!(version, error = %e, "Migration statement failed");
                Self::map_error("Migration failed", e)
            })?;
        }

        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")
            .bind(version)
            .bind(chrono::Utc::now().timestamp())
            .execute(&mut *tx)
            .await
            .map_err(|e| Self::map_error("Recording migration failed", e))?;

        tx.commit()
            .await
            .map_err(|e| Self::map_error("Commit failed", e))?;

        info!(version, "Migration applied successfully");
        Ok(())
    }
}
