//! # Domain Models
//!
//! Canonical records produced by the normalizer and stored by the cache.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PricePoint`] | OHLCV observation, day or intraday |
//! | [`FinancialMetric`] | Ratio snapshot for one report period |
//! | [`LineItem`] | Named statement values for one report period |
//! | [`InsiderTrade`] | Reported insider transaction |
//! | [`CompanyNewsItem`] | News article about a company |
//! | [`SecurityId`] | Symbol plus [`AssetClass`] |
//! | [`MarketTime`] | Compact exchange-local timestamp |
//! | [`DateWindow`] | Inclusive date range with optional start |
//!
//! Construction validates invariants, and so does deserialization of raw
//! cache records: a [`PricePoint`] with `high < low` cannot be built either way.

mod asset;
mod models;
mod symbol;
mod timestamp;

pub use asset::{AssetClass, SecurityId};
pub use models::{
    CompanyNewsItem, FinancialMetric, InsiderTrade, LineItem, PeriodKind, PricePoint,
    TradeIdentity,
};
pub use symbol::Symbol;
pub use timestamp::{
    compact_date, format_date, iso_date, option_iso_date, parse_date, DateWindow, Granularity,
    MarketTime,
};
