use thiserror::Error;
use time::Date;

use crate::cache::EntityKind;
use crate::data_source::SourceError;
use crate::domain::{AssetClass, Symbol};

/// Validation and contract errors exposed by `ferrofeed-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid asset class '{value}', expected one of domestic, foreign, derivative")]
    InvalidAssetClass { value: String },
    #[error("invalid period '{value}', expected one of ttm, annual, quarterly")]
    InvalidPeriod { value: String },

    #[error("invalid date '{value}', expected YYYY-MM-DD or YYYYMMDD")]
    InvalidDate { value: String },
    #[error("invalid timestamp '{value}'")]
    InvalidTimestamp { value: String },
    #[error("window start {start} is after end {end}")]
    InvertedWindow { start: Date, end: Date },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
    #[error("price high must be >= low")]
    InvalidPriceRange,
    #[error("price open/close must be within high/low range")]
    InvalidPriceBounds,

    #[error("limit must be greater than zero")]
    ZeroLimit,
    #[error("line item search requires at least one line item name")]
    EmptyLineItems,

    #[error("invalid value '{value}' for setting {name}")]
    InvalidSetting { name: &'static str, value: String },
}

/// Per-row failure raised while mapping a provider row onto a canonical record.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("row {row}: missing column '{column}'")]
    MissingColumn { row: usize, column: &'static str },
    #[error("row {row}: column '{column}' has unusable value {value}")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("row {row}: {source}")]
    Invalid {
        row: usize,
        #[source]
        source: ValidationError,
    },
    #[error("row {row}: {message}")]
    Decode { row: usize, message: String },
}

/// Failure reported by a cache gateway backend.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache payload could not be encoded: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Top-level error for the retrieval operations.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("no {kind} data returned for {symbol} through {end}")]
    DataUnavailable {
        kind: EntityKind,
        symbol: Symbol,
        end: Date,
    },

    #[error("remote request for {symbol} failed: {source}")]
    RemoteRequestFailed {
        symbol: Symbol,
        #[source]
        source: SourceError,
    },

    #[error("no {kind} source registered{}", scope_suffix(.asset_class))]
    SourceNotRegistered {
        kind: EntityKind,
        asset_class: Option<AssetClass>,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

fn scope_suffix(asset_class: &Option<AssetClass>) -> String {
    asset_class
        .map(|asset_class| format!(" for asset class '{asset_class}'"))
        .unwrap_or_default()
}

impl RetrievalError {
    pub(crate) fn remote(symbol: &Symbol, source: SourceError) -> Self {
        Self::RemoteRequestFailed {
            symbol: symbol.clone(),
            source,
        }
    }

    /// HTTP status attached to a remote failure, when the provider answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteRequestFailed { source, .. } => source.status(),
            _ => None,
        }
    }
}
