//! Cache gateway contract and the in-memory gateway.
//!
//! The gateway stores raw records (JSON objects in the canonical record
//! shape) keyed by `(kind, symbol)`. It knows nothing about windows or
//! sufficiency; those decisions live in [`crate::reconcile`].

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{CacheError, Symbol};

/// A record as persisted by the cache: a JSON object in canonical shape.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Boxed future returned by gateway operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + Send + 'a>>;

/// Record family a cache entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Prices,
    FinancialMetrics,
    LineItems,
    InsiderTrades,
    CompanyNews,
}

impl EntityKind {
    pub const ALL: [Self; 5] = [
        Self::Prices,
        Self::FinancialMetrics,
        Self::LineItems,
        Self::InsiderTrades,
        Self::CompanyNews,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prices => "prices",
            Self::FinancialMetrics => "financial_metrics",
            Self::LineItems => "line_items",
            Self::InsiderTrades => "insider_trades",
            Self::CompanyNews => "company_news",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| format!("unknown cache kind '{value}'"))
    }
}

/// Defines how a retrieval call interacts with the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Serve from the cache when it covers the request;
    /// otherwise fetch, merge and write back. (Default)
    #[default]
    Use,
    /// Skip the coverage check, fetch, then merge and write back.
    Refresh,
    /// Fetch without reading or writing the cache.
    Bypass,
}

impl CacheMode {
    pub const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub const fn writes(self) -> bool {
        !matches!(self, Self::Bypass)
    }
}

/// Persistent key/value store for raw records.
///
/// Implementations must be `Send + Sync`; the retrieval service shares one
/// gateway across calls and never holds a gateway borrow across a remote fetch.
pub trait CacheGateway: Send + Sync {
    /// Every record stored for `(kind, symbol)`, or `None` when nothing is stored.
    fn get<'a>(&'a self, kind: EntityKind, symbol: &'a Symbol) -> CacheFuture<'a, Option<Vec<RawRecord>>>;

    /// Replace the stored records for `(kind, symbol)`.
    fn set<'a>(
        &'a self,
        kind: EntityKind,
        symbol: &'a Symbol,
        records: Vec<RawRecord>,
    ) -> CacheFuture<'a, ()>;
}

/// Thread-safe in-memory cache gateway.
///
/// Entries are held as serialized JSON so reads see the same shape a
/// persistent gateway would return. They live for the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<tokio::sync::RwLock<HashMap<(EntityKind, Symbol), String>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheGateway for MemoryCache {
    fn get<'a>(&'a self, kind: EntityKind, symbol: &'a Symbol) -> CacheFuture<'a, Option<Vec<RawRecord>>> {
        Box::pin(async move {
            let body = {
                let entries = self.entries.read().await;
                entries.get(&(kind, symbol.clone())).cloned()
            };

            match body {
                Some(body) => Ok(Some(serde_json::from_str(&body)?)),
                None => Ok(None),
            }
        })
    }

    fn set<'a>(
        &'a self,
        kind: EntityKind,
        symbol: &'a Symbol,
        records: Vec<RawRecord>,
    ) -> CacheFuture<'a, ()> {
        Box::pin(async move {
            let body = serde_json::to_string(&records)?;
            let mut entries = self.entries.write().await;
            entries.insert((kind, symbol.clone()), body);
            Ok(())
        })
    }
}
