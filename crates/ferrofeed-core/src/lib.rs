//! # Ferrofeed Core
//!
//! Cache-aware retrieval of market data: prices, financial metrics, line
//! items, insider trades and company news.
//!
//! ## Overview
//!
//! - **Domain records** with invariants enforced at construction and on
//!   deserialization
//! - **Record normalizer** mapping provider schemas onto canonical records
//! - **Range reconciliation** deciding when the cache answers a request
//! - **Cutoff-narrowing pagination** for insider trades
//! - **Provider adapters** behind the [`HttpClient`] seam
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Eastmoney, Sina and financialdatasets.ai adapters |
//! | [`cache`] | Cache gateway trait and in-memory gateway |
//! | [`config`] | Service configuration and feature switches |
//! | [`data_source`] | Remote collaborator traits and queries |
//! | [`domain`] | Canonical records, symbols, timestamps |
//! | [`error`] | Error types |
//! | [`frame`] | Columnar price view |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`normalize`] | Provider rows to canonical records |
//! | [`pagination`] | Insider-trade page driver |
//! | [`reconcile`] | Coverage checks, fetch plans, merges |
//! | [`service`] | The retrieval operations |
//! | [`sources`] | Source registry |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ferrofeed_core::{
//!     AssetClass, MarketDataService, MemoryCache, PriceRequest, SecurityId, ServiceConfig,
//!     SourceSet, parse_date,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = MarketDataService::new(
//!         Arc::new(MemoryCache::new()),
//!         SourceSet::builder().with_default_adapters().build(),
//!         ServiceConfig::from_env()?,
//!     );
//!
//!     let security = SecurityId::parse("600519", AssetClass::EquityDomestic)?;
//!     let request = PriceRequest::new(security, parse_date("2024-01-02")?, parse_date("2024-01-31")?)?;
//!     for point in service.get_prices(&request).await? {
//!         println!("{} {:.2}", point.time, point.close);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐     ┌──────────────────┐
//! │  MarketDataService   │────▶│  CacheGateway    │
//! │  (reconcile, pager)  │     │  (memory/duckdb) │
//! └──────────┬───────────┘     └──────────────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐     ┌──────────────────┐
//! │  SourceSet           │────▶│  HttpClient      │
//! │  (adapter traits)    │     │  (reqwest)       │
//! └──────────┬───────────┘     └──────────────────┘
//!            │ raw rows
//!            ▼
//! ┌──────────────────────┐
//! │  Normalizer          │
//! └──────────────────────┘
//! ```

pub mod adapters;
pub mod cache;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod frame;
pub mod http_client;
pub mod normalize;
pub mod pagination;
pub mod reconcile;
pub mod service;
pub mod sources;

pub use adapters::{EastmoneyAdapter, FinancialDatasetsAdapter, SinaAdapter};

pub use cache::{CacheGateway, CacheMode, EntityKind, MemoryCache, RawRecord};

pub use config::{RetrievalFeatures, ServiceConfig};

pub use data_source::{
    FundamentalsSource, InsiderTradeQuery, InsiderTradeSource, LineItemQuery, MetricsQuery,
    NewsQuery, NewsSource, PriceQuery, PriceSource, RawRow, SourceError, SourceErrorKind,
    SourceFuture,
};

pub use domain::{
    compact_date, format_date, parse_date, AssetClass, CompanyNewsItem, DateWindow,
    FinancialMetric, Granularity, InsiderTrade, LineItem, MarketTime, PeriodKind, PricePoint,
    SecurityId, Symbol,
};

pub use error::{CacheError, NormalizeError, RetrievalError, ValidationError};

pub use frame::PriceFrame;

pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
    ScriptedHttpClient,
};

pub use pagination::{CollectedTrades, InsiderTradePager};

pub use service::{
    InsiderTradeRequest, LineItemRequest, MarketDataService, MetricsRequest, NewsRequest,
    PriceRequest,
};

pub use sources::{SourceSet, SourceSetBuilder};
