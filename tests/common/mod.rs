//! In-process fakes shared by the behaviour tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ferrofeed_core::{
    format_date, AssetClass, CacheGateway, EntityKind, FundamentalsSource, InsiderTradeQuery, InsiderTradeSource,
    LineItemQuery, MarketDataService, MemoryCache, MetricsQuery, NewsQuery, NewsSource,
    PriceQuery, PriceSource, RawRow, RetrievalFeatures, SecurityId, ServiceConfig, SourceError,
    SourceFuture, SourceSet, Symbol,
};
use serde_json::Value;
use time::{Date, Duration};

pub fn row(value: Value) -> RawRow {
    value.as_object().cloned().expect("row literal must be an object")
}

pub fn symbol(raw: &str) -> Symbol {
    Symbol::parse(raw).expect("valid symbol")
}

pub fn security(raw: &str, asset_class: AssetClass) -> SecurityId {
    SecurityId::new(symbol(raw), asset_class)
}

/// A domestic kline row with the exchange's column labels.
pub fn domestic_bar(date: &str, close: f64) -> RawRow {
    row(serde_json::json!({
        "日期": date,
        "开盘": format!("{:.2}", close - 1.0),
        "收盘": format!("{close:.2}"),
        "最高": format!("{:.2}", close + 1.0),
        "最低": format!("{:.2}", close - 2.0),
        "成交量": "10000",
    }))
}

/// True when the cache holds no `kind` entry for `raw`.
pub async fn nothing_cached(cache: &MemoryCache, kind: EntityKind, raw: &str) -> bool {
    cache
        .get(kind, &symbol(raw))
        .await
        .expect("cache read")
        .is_none()
}

pub fn service(cache: Arc<MemoryCache>, sources: SourceSet) -> MarketDataService {
    service_with(cache, sources, RetrievalFeatures::all())
}

pub fn service_with(
    cache: Arc<MemoryCache>,
    sources: SourceSet,
    features: RetrievalFeatures,
) -> MarketDataService {
    MarketDataService::new(cache, sources, ServiceConfig::default().with_features(features))
}

fn reply(result: Result<Vec<RawRow>, SourceError>) -> SourceFuture<'static, Vec<RawRow>> {
    Box::pin(async move { result })
}

/// Price source answering every query with the same rows.
pub struct StubPrices {
    asset_class: AssetClass,
    rows: Vec<RawRow>,
    failure: Option<u16>,
    queries: Mutex<Vec<PriceQuery>>,
}

impl StubPrices {
    pub fn new(asset_class: AssetClass, rows: Vec<RawRow>) -> Self {
        Self {
            asset_class,
            rows,
            failure: None,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with the given HTTP status.
    pub fn failing(asset_class: AssetClass, status: u16) -> Self {
        Self {
            failure: Some(status),
            ..Self::new(asset_class, Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().expect("queries lock").len()
    }

    pub fn last_query(&self) -> Option<PriceQuery> {
        self.queries.lock().expect("queries lock").last().cloned()
    }
}

impl PriceSource for StubPrices {
    fn asset_class(&self) -> AssetClass {
        self.asset_class
    }

    fn fetch_prices<'a>(&'a self, query: &'a PriceQuery) -> SourceFuture<'a, Vec<RawRow>> {
        self.queries.lock().expect("queries lock").push(query.clone());
        match self.failure {
            Some(status) => reply(Err(SourceError::from_status("stub", status, "failure"))),
            None => reply(Ok(self.rows.clone())),
        }
    }
}

/// Fundamentals source with fixed metric and line-item rows.
#[derive(Default)]
pub struct StubFundamentals {
    pub metrics: Vec<RawRow>,
    pub line_items: Vec<RawRow>,
    calls: AtomicUsize,
}

impl StubFundamentals {
    pub fn new(metrics: Vec<RawRow>, line_items: Vec<RawRow>) -> Self {
        Self {
            metrics,
            line_items,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FundamentalsSource for StubFundamentals {
    fn fetch_financial_metrics<'a>(
        &'a self,
        _query: &'a MetricsQuery,
    ) -> SourceFuture<'a, Vec<RawRow>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        reply(Ok(self.metrics.clone()))
    }

    fn search_line_items<'a>(&'a self, _query: &'a LineItemQuery) -> SourceFuture<'a, Vec<RawRow>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        reply(Ok(self.line_items.clone()))
    }
}

/// Insider filings, one per day, answering pages the way the provider does:
/// newest first, at most `limit`, inside `[gte, lte]`.
pub struct DailyFilings {
    dates: Vec<Date>,
    calls: AtomicUsize,
}

impl DailyFilings {
    pub fn new(newest: Date, count: usize) -> Self {
        let dates = (0..count)
            .map(|offset| newest - Duration::days(offset as i64))
            .collect();
        Self {
            dates,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn oldest(&self) -> Option<Date> {
        self.dates.last().copied()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InsiderTradeSource for DailyFilings {
    fn fetch_insider_trades<'a>(
        &'a self,
        query: &'a InsiderTradeQuery,
    ) -> SourceFuture<'a, Vec<RawRow>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let rows = self
            .dates
            .iter()
            .filter(|date| **date <= query.filing_date_lte)
            .filter(|date| query.filing_date_gte.map_or(true, |gte| **date >= gte))
            .take(query.limit)
            .map(|date| {
                row(serde_json::json!({
                    "ticker": query.symbol.as_str(),
                    "name": "Jane Officer",
                    "title": "CFO",
                    "transaction_shares": 100.0,
                    "filing_date": format_date(*date),
                }))
            })
            .collect();
        reply(Ok(rows))
    }
}

/// Domestic news source with fixed rows.
pub struct StubNews {
    rows: Vec<RawRow>,
    calls: AtomicUsize,
}

impl StubNews {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self {
            rows,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl NewsSource for StubNews {
    fn asset_class(&self) -> AssetClass {
        AssetClass::EquityDomestic
    }

    fn fetch_news<'a>(&'a self, _query: &'a NewsQuery) -> SourceFuture<'a, Vec<RawRow>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        reply(Ok(self.rows.clone()))
    }
}
