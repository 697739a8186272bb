//! # Ferrofeed Warehouse
//!
//! DuckDB-backed persistent cache for ferrofeed.
//!
//! ## Overview
//!
//! The warehouse keeps one row per `(kind, symbol)` holding the JSON array
//! of canonical records last written for that key. [`WarehouseCache`] puts
//! it behind the core [`CacheGateway`](ferrofeed_core::CacheGateway) trait so
//! the retrieval service can use it in place of the in-memory gateway.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ferrofeed_core::{MarketDataService, ServiceConfig, SourceSet};
//! use ferrofeed_warehouse::{Warehouse, WarehouseCache};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open_default()?;
//!     let service = MarketDataService::new(
//!         Arc::new(WarehouseCache::new(warehouse)),
//!         SourceSet::builder().with_default_adapters().build(),
//!         ServiceConfig::from_env()?,
//!     );
//!     # let _ = service;
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `cache_entries` | Cached record arrays keyed by kind and symbol |
//! | `schema_migrations` | Applied migration versions |

mod cache;
pub mod duckdb;
pub mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{params, OptionalExt};
use ferrofeed_core::{CacheError, EntityKind, RawRecord, Symbol};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub use cache::WarehouseCache;
pub use duckdb::{DuckDbConnectionManager, PooledConnection};

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A stored payload is not a JSON array of records.
    #[error("cached payload is not valid JSON: {0}")]
    Codec(#[from] serde_json::Error),

    /// A stored row has a kind or symbol this build does not recognise.
    #[error("invalid cache entry: {0}")]
    InvalidEntry(String),

    /// The blocking task running a warehouse call failed.
    #[error("warehouse task failed: {0}")]
    Task(String),
}

impl From<WarehouseError> for CacheError {
    fn from(error: WarehouseError) -> Self {
        CacheError::Backend(error.to_string())
    }
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for ferrofeed data.
    pub ferrofeed_home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections in the pool.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let ferrofeed_home = resolve_ferrofeed_home();
        let db_path = ferrofeed_home.join("cache").join("ferrofeed.duckdb");
        Self {
            ferrofeed_home,
            db_path,
            max_pool_size: 4,
        }
    }
}

impl WarehouseConfig {
    /// Default configuration with the database file moved to `db_path`.
    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }
}

/// One row of the cache listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntrySummary {
    pub kind: EntityKind,
    pub symbol: Symbol,
    pub record_count: u64,
    pub updated_at: String,
}

/// The persistent store behind [`WarehouseCache`].
#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    /// Open a warehouse with default configuration.
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open a warehouse with the specified configuration.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::open(config.db_path.clone(), config.max_pool_size)?;
        let warehouse = Self { config, manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Apply pending schema migrations.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    /// Get the path to the database file.
    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    /// Records stored for `(kind, symbol)`, or `None` when the key is absent.
    pub fn load(
        &self,
        kind: EntityKind,
        symbol: &Symbol,
    ) -> Result<Option<Vec<RawRecord>>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let payload: Option<String> = connection
            .query_row(
                "SELECT payload FROM cache_entries WHERE kind = ? AND symbol = ?",
                params![kind.as_str(), symbol.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(payload) = payload else {
            debug!(%kind, %symbol, "warehouse miss");
            return Ok(None);
        };

        let records: Vec<RawRecord> = serde_json::from_str(&payload)?;
        debug!(%kind, %symbol, records = records.len(), "warehouse hit");
        Ok(Some(records))
    }

    /// Replace the records stored for `(kind, symbol)`.
    pub fn store(
        &self,
        kind: EntityKind,
        symbol: &Symbol,
        records: &[RawRecord],
    ) -> Result<(), WarehouseError> {
        let payload = serde_json::to_string(records)?;
        let record_count = i64::try_from(records.len()).unwrap_or(i64::MAX);

        let connection = self.manager.acquire()?;
        connection.execute(
            "INSERT OR REPLACE INTO cache_entries \
             (kind, symbol, payload, record_count, updated_at) \
             VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)",
            params![kind.as_str(), symbol.as_str(), payload, record_count],
        )?;

        debug!(%kind, %symbol, records = records.len(), "warehouse write");
        Ok(())
    }

    /// Every stored key with its record count, ordered by kind then symbol.
    pub fn entries(&self) -> Result<Vec<CacheEntrySummary>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT kind, symbol, record_count, CAST(updated_at AS VARCHAR) \
             FROM cache_entries ORDER BY kind, symbol",
        )?;
        let rows = statement.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (kind, symbol, record_count, updated_at) = row?;
            let kind = kind
                .parse::<EntityKind>()
                .map_err(WarehouseError::InvalidEntry)?;
            let symbol = Symbol::parse(&symbol)
                .map_err(|error| WarehouseError::InvalidEntry(error.to_string()))?;
            entries.push(CacheEntrySummary {
                kind,
                symbol,
                record_count: u64::try_from(record_count).unwrap_or(0),
                updated_at,
            });
        }

        Ok(entries)
    }

    /// Delete stored entries, all of them or only those of `kind`.
    ///
    /// Returns the number of keys removed.
    pub fn clear(&self, kind: Option<EntityKind>) -> Result<usize, WarehouseError> {
        let connection = self.manager.acquire()?;
        let removed = match kind {
            Some(kind) => connection.execute(
                "DELETE FROM cache_entries WHERE kind = ?",
                params![kind.as_str()],
            )?,
            None => connection.execute("DELETE FROM cache_entries", [])?,
        };

        debug!(?kind, removed, "warehouse cleared");
        Ok(removed)
    }
}

/// Resolve the ferrofeed home directory from environment or default.
fn resolve_ferrofeed_home() -> PathBuf {
    if let Some(path) = env::var_os("FERROFEED_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".ferrofeed");
    }

    PathBuf::from(".ferrofeed")
}
