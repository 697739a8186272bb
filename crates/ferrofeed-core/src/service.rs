//! Cache-aware retrieval service.
//!
//! Every operation follows the same read-through protocol:
//!
//! 1. Unless bypassing, load the cached records for the symbol.
//! 2. In [`CacheMode::Use`], return the selection when the cache has any
//!    matching record.
//! 3. Otherwise fetch, normalize, and return the same selection applied to
//!    the fetched set.
//! 4. Unless bypassing, merge the full fetched set into the cached snapshot
//!    and write it back.
//!
//! Because the returned value is always the selection a later cache hit
//! would produce, repeating a call yields the same records.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use time::Date;
use tracing::{debug, instrument, warn};

use crate::cache::{CacheGateway, CacheMode, EntityKind};
use crate::config::ServiceConfig;
use crate::data_source::{LineItemQuery, MetricsQuery, NewsQuery};
use crate::frame::PriceFrame;
use crate::normalize::{
    decode_cached, encode_records, normalize_news, normalize_prices, normalize_records,
};
use crate::pagination::InsiderTradePager;
use crate::reconcile::{
    coarse_hit, merge_by_key, plan_price_fetch, select, InsiderTradeCriteria, LineItemCriteria,
    MetricCriteria, NewsCriteria, PriceCriteria,
};
use crate::sources::SourceSet;
use crate::{
    CompanyNewsItem, DateWindow, FinancialMetric, InsiderTrade, LineItem, PeriodKind, PricePoint,
    RetrievalError, SecurityId, Symbol, ValidationError,
};

/// Price history request for `[start, end]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRequest {
    pub security: SecurityId,
    pub window: DateWindow,
    pub mode: CacheMode,
}

impl PriceRequest {
    pub fn new(security: SecurityId, start: Date, end: Date) -> Result<Self, ValidationError> {
        Ok(Self {
            security,
            window: DateWindow::bounded(start, end)?,
            mode: CacheMode::Use,
        })
    }

    pub fn with_mode(mut self, mode: CacheMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Up to `limit` metric snapshots reported on or before `end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsRequest {
    pub symbol: Symbol,
    pub end: Date,
    pub period: PeriodKind,
    pub limit: usize,
    pub mode: CacheMode,
}

impl MetricsRequest {
    pub fn new(
        symbol: Symbol,
        end: Date,
        period: PeriodKind,
        limit: usize,
    ) -> Result<Self, ValidationError> {
        if limit == 0 {
            return Err(ValidationError::ZeroLimit);
        }
        Ok(Self {
            symbol,
            end,
            period,
            limit,
            mode: CacheMode::Use,
        })
    }

    pub fn with_mode(mut self, mode: CacheMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Search for named statement line items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemRequest {
    pub symbol: Symbol,
    pub line_items: Vec<String>,
    pub end: Date,
    pub period: PeriodKind,
    pub limit: usize,
    pub mode: CacheMode,
}

impl LineItemRequest {
    pub fn new<I, S>(
        symbol: Symbol,
        line_items: I,
        end: Date,
        period: PeriodKind,
        limit: usize,
    ) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names = line_items
            .into_iter()
            .map(|name| name.as_ref().trim().to_owned())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>();
        names.sort();
        names.dedup();

        if names.is_empty() {
            return Err(ValidationError::EmptyLineItems);
        }
        if limit == 0 {
            return Err(ValidationError::ZeroLimit);
        }

        Ok(Self {
            symbol,
            line_items: names,
            end,
            period,
            limit,
            mode: CacheMode::Use,
        })
    }

    pub fn with_mode(mut self, mode: CacheMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Insider trades in a window; without a start only the newest page is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsiderTradeRequest {
    pub symbol: Symbol,
    pub window: DateWindow,
    /// Page size override; the configured page limit otherwise.
    pub page_limit: Option<usize>,
    pub mode: CacheMode,
}

impl InsiderTradeRequest {
    pub fn new(symbol: Symbol, start: Option<Date>, end: Date) -> Result<Self, ValidationError> {
        Ok(Self {
            symbol,
            window: DateWindow::new(start, end)?,
            page_limit: None,
            mode: CacheMode::Use,
        })
    }

    pub fn with_page_limit(mut self, page_limit: usize) -> Result<Self, ValidationError> {
        if page_limit == 0 {
            return Err(ValidationError::ZeroLimit);
        }
        self.page_limit = Some(page_limit);
        Ok(self)
    }

    pub fn with_mode(mut self, mode: CacheMode) -> Self {
        self.mode = mode;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsRequest {
    pub security: SecurityId,
    pub window: DateWindow,
    /// Result cap; the configured news limit otherwise.
    pub limit: Option<usize>,
    pub mode: CacheMode,
}

impl NewsRequest {
    pub fn new(security: SecurityId, start: Option<Date>, end: Date) -> Result<Self, ValidationError> {
        Ok(Self {
            security,
            window: DateWindow::new(start, end)?,
            limit: None,
            mode: CacheMode::Use,
        })
    }

    pub fn with_limit(mut self, limit: usize) -> Result<Self, ValidationError> {
        if limit == 0 {
            return Err(ValidationError::ZeroLimit);
        }
        self.limit = Some(limit);
        Ok(self)
    }

    pub fn with_mode(mut self, mode: CacheMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Market data retrieval over an injected cache gateway and source set.
#[derive(Clone)]
pub struct MarketDataService {
    cache: Arc<dyn CacheGateway>,
    sources: SourceSet,
    config: ServiceConfig,
}

impl MarketDataService {
    pub fn new(cache: Arc<dyn CacheGateway>, sources: SourceSet, config: ServiceConfig) -> Self {
        Self {
            cache,
            sources,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    /// Price points inside the request window, ascending by time.
    ///
    /// # Errors
    ///
    /// [`RetrievalError::DataUnavailable`] when a required fetch returns no
    /// usable rows; the cache is left untouched in that case.
    #[instrument(skip_all, fields(symbol = %request.security.symbol, asset_class = %request.security.asset_class, mode = ?request.mode))]
    pub async fn get_prices(&self, request: &PriceRequest) -> Result<Vec<PricePoint>, RetrievalError> {
        let symbol = &request.security.symbol;
        let asset_class = request.security.asset_class;
        let criteria = PriceCriteria {
            window: request.window,
        };

        let cached: Vec<PricePoint> = self.snapshot(EntityKind::Prices, symbol, request.mode).await?;
        if request.mode.reads() {
            if let Some(hit) = coarse_hit(&cached, &criteria) {
                debug!(cached = cached.len(), returned = hit.len(), "price cache hit");
                return Ok(hit);
            }
        }

        let source = self.sources.price_source(asset_class).ok_or(
            RetrievalError::SourceNotRegistered {
                kind: EntityKind::Prices,
                asset_class: Some(asset_class),
            },
        )?;
        let query = plan_price_fetch(
            &request.security,
            &request.window,
            self.config.domestic_history_start,
        );
        let rows = source
            .fetch_prices(&query)
            .await
            .map_err(|source| RetrievalError::remote(symbol, source))?;
        let fetched = normalize_prices(asset_class, &rows);
        debug!(rows = rows.len(), fetched = fetched.len(), start = ?query.start, "fetched prices");

        if fetched.is_empty() {
            return Err(RetrievalError::DataUnavailable {
                kind: EntityKind::Prices,
                symbol: symbol.clone(),
                end: request.window.end(),
            });
        }

        let visible = select(&fetched, &criteria);
        if request.mode.writes() {
            let merged = merge_by_key(cached, fetched, |point| point.time);
            self.store(EntityKind::Prices, symbol, &merged).await?;
        }
        Ok(visible)
    }

    /// [`MarketDataService::get_prices`] as a columnar frame.
    pub async fn get_price_frame(&self, request: &PriceRequest) -> Result<PriceFrame, RetrievalError> {
        let points = self.get_prices(request).await?;
        Ok(PriceFrame::from_points(&points))
    }

    /// Metric snapshots of the requested period kind, newest first.
    ///
    /// Empty when financial metrics are disabled or the provider has none.
    #[instrument(skip_all, fields(symbol = %request.symbol, end = %request.end, period = %request.period))]
    pub async fn get_financial_metrics(
        &self,
        request: &MetricsRequest,
    ) -> Result<Vec<FinancialMetric>, RetrievalError> {
        if !self.config.features.financial_metrics {
            debug!("financial metrics disabled");
            return Ok(Vec::new());
        }

        let symbol = &request.symbol;
        let criteria = MetricCriteria {
            end: request.end,
            period: request.period,
            limit: request.limit,
        };

        let cached: Vec<FinancialMetric> =
            self.snapshot(EntityKind::FinancialMetrics, symbol, request.mode).await?;
        if request.mode.reads() {
            if let Some(hit) = coarse_hit(&cached, &criteria) {
                debug!(returned = hit.len(), "metrics cache hit");
                return Ok(hit);
            }
        }

        let source = self.sources.fundamentals().ok_or(RetrievalError::SourceNotRegistered {
            kind: EntityKind::FinancialMetrics,
            asset_class: None,
        })?;
        let query = MetricsQuery {
            symbol: symbol.clone(),
            end: request.end,
            period: request.period,
            limit: request.limit,
        };
        let rows = source
            .fetch_financial_metrics(&query)
            .await
            .map_err(|source| RetrievalError::remote(symbol, source))?;
        let fetched: Vec<FinancialMetric> = normalize_records(EntityKind::FinancialMetrics, rows);
        debug!(fetched = fetched.len(), "fetched financial metrics");
        if fetched.is_empty() {
            return Ok(Vec::new());
        }

        let visible = select(&fetched, &criteria);
        if request.mode.writes() {
            let merged = merge_by_key(cached, fetched, FinancialMetric::key);
            self.store(EntityKind::FinancialMetrics, symbol, &merged).await?;
        }
        Ok(visible)
    }

    /// Line-item records carrying every requested name, newest first.
    #[instrument(skip_all, fields(symbol = %request.symbol, end = %request.end, items = request.line_items.len()))]
    pub async fn search_line_items(
        &self,
        request: &LineItemRequest,
    ) -> Result<Vec<LineItem>, RetrievalError> {
        if !self.config.features.line_items {
            debug!("line items disabled");
            return Ok(Vec::new());
        }

        let symbol = &request.symbol;
        let criteria = LineItemCriteria {
            end: request.end,
            period: request.period,
            line_items: request.line_items.clone(),
            limit: request.limit,
        };

        let cached: Vec<LineItem> = self.snapshot(EntityKind::LineItems, symbol, request.mode).await?;
        if request.mode.reads() {
            if let Some(hit) = coarse_hit(&cached, &criteria) {
                debug!(returned = hit.len(), "line item cache hit");
                return Ok(hit);
            }
        }

        let source = self.sources.fundamentals().ok_or(RetrievalError::SourceNotRegistered {
            kind: EntityKind::LineItems,
            asset_class: None,
        })?;
        let query = LineItemQuery {
            symbol: symbol.clone(),
            line_items: request.line_items.clone(),
            end: request.end,
            period: request.period,
            limit: request.limit,
        };
        let rows = source
            .search_line_items(&query)
            .await
            .map_err(|source| RetrievalError::remote(symbol, source))?;
        let fetched: Vec<LineItem> = normalize_records(EntityKind::LineItems, rows);
        debug!(fetched = fetched.len(), "fetched line items");
        if fetched.is_empty() {
            return Ok(Vec::new());
        }

        let visible = select(&fetched, &criteria);
        if request.mode.writes() {
            let merged = merge_line_items(cached, fetched);
            self.store(EntityKind::LineItems, symbol, &merged).await?;
        }
        Ok(visible)
    }

    /// Insider trades whose effective date falls in the window, newest first.
    #[instrument(skip_all, fields(symbol = %request.symbol, start = ?request.window.start(), end = %request.window.end()))]
    pub async fn get_insider_trades(
        &self,
        request: &InsiderTradeRequest,
    ) -> Result<Vec<InsiderTrade>, RetrievalError> {
        if !self.config.features.insider_trades {
            debug!("insider trades disabled");
            return Ok(Vec::new());
        }

        let symbol = &request.symbol;
        let criteria = InsiderTradeCriteria {
            window: request.window,
        };

        let cached: Vec<InsiderTrade> =
            self.snapshot(EntityKind::InsiderTrades, symbol, request.mode).await?;
        if request.mode.reads() {
            if let Some(hit) = coarse_hit(&cached, &criteria) {
                debug!(returned = hit.len(), "insider trade cache hit");
                return Ok(hit);
            }
        }

        let source = self.sources.insider_trades().ok_or(RetrievalError::SourceNotRegistered {
            kind: EntityKind::InsiderTrades,
            asset_class: None,
        })?;
        let page_limit = request.page_limit.unwrap_or(self.config.insider_page_limit);
        let pager = InsiderTradePager::new(source, page_limit)?;
        let collected = pager
            .collect(symbol, request.window.end(), request.window.start())
            .await?;
        debug!(
            calls = collected.calls,
            fetched = collected.trades.len(),
            "collected insider trades"
        );
        if collected.trades.is_empty() {
            return Ok(Vec::new());
        }

        let fetched = collected.trades;
        let visible = select(&fetched, &criteria);
        if request.mode.writes() {
            let merged = merge_by_key(cached, fetched, InsiderTrade::identity);
            self.store(EntityKind::InsiderTrades, symbol, &merged).await?;
        }
        Ok(visible)
    }

    /// Company news inside the window, newest first.
    ///
    /// Asset classes without a news source yield an empty result, not an error.
    #[instrument(skip_all, fields(symbol = %request.security.symbol, asset_class = %request.security.asset_class))]
    pub async fn get_company_news(
        &self,
        request: &NewsRequest,
    ) -> Result<Vec<CompanyNewsItem>, RetrievalError> {
        let symbol = &request.security.symbol;
        let Some(source) = self.sources.news_source(request.security.asset_class) else {
            debug!("no news source for asset class");
            return Ok(Vec::new());
        };
        let criteria = NewsCriteria {
            window: request.window,
            limit: request.limit.unwrap_or(self.config.news_limit),
        };

        let cached: Vec<CompanyNewsItem> =
            self.snapshot(EntityKind::CompanyNews, symbol, request.mode).await?;
        if request.mode.reads() {
            if let Some(hit) = coarse_hit(&cached, &criteria) {
                debug!(returned = hit.len(), "news cache hit");
                return Ok(hit);
            }
        }

        let query = NewsQuery {
            symbol: symbol.clone(),
            end: request.window.end(),
        };
        let rows = source
            .fetch_news(&query)
            .await
            .map_err(|source| RetrievalError::remote(symbol, source))?;
        // Providers may return articles published after `end`; only those
        // through the end of that day count as fetched.
        let through_end = DateWindow::through(request.window.end());
        let fetched = normalize_news(&rows)
            .into_iter()
            .filter(|item| through_end.contains(item.date))
            .collect::<Vec<_>>();
        debug!(rows = rows.len(), fetched = fetched.len(), "fetched news");
        if fetched.is_empty() {
            return Err(RetrievalError::DataUnavailable {
                kind: EntityKind::CompanyNews,
                symbol: symbol.clone(),
                end: request.window.end(),
            });
        }

        let visible = select(&fetched, &criteria);
        if request.mode.writes() {
            let merged = merge_by_key(cached, fetched, |item| {
                (item.date, item.url.clone(), item.title.clone())
            });
            self.store(EntityKind::CompanyNews, symbol, &merged).await?;
        }
        Ok(visible)
    }

    /// Market capitalization from the most recent metric snapshot on or before `as_of`.
    ///
    /// `None` when no snapshot exists or it reports no (or a zero) market cap.
    #[instrument(skip(self))]
    pub async fn get_market_cap(
        &self,
        symbol: &Symbol,
        as_of: Date,
    ) -> Result<Option<f64>, RetrievalError> {
        let request = MetricsRequest::new(
            symbol.clone(),
            as_of,
            self.config.metrics_period,
            self.config.metrics_limit,
        )?;
        let metrics = self.get_financial_metrics(&request).await?;

        let market_cap = metrics
            .first()
            .and_then(|metric| metric.market_cap)
            .filter(|value| value.is_finite() && *value != 0.0);
        debug!(?market_cap, "market cap");
        Ok(market_cap)
    }

    /// Cached records for `(kind, symbol)`; empty when bypassing or when
    /// the stored entry no longer decodes.
    async fn snapshot<T: DeserializeOwned>(
        &self,
        kind: EntityKind,
        symbol: &Symbol,
        mode: CacheMode,
    ) -> Result<Vec<T>, RetrievalError> {
        if !mode.writes() {
            return Ok(Vec::new());
        }

        let Some(records) = self.cache.get(kind, symbol).await? else {
            return Ok(Vec::new());
        };
        match decode_cached(records) {
            Ok(decoded) => Ok(decoded),
            Err(error) => {
                warn!(%kind, %symbol, %error, "ignoring undecodable cache entry");
                Ok(Vec::new())
            }
        }
    }

    async fn store<T: Serialize>(
        &self,
        kind: EntityKind,
        symbol: &Symbol,
        records: &[T],
    ) -> Result<(), RetrievalError> {
        let raw = encode_records(records)?;
        debug!(%kind, %symbol, records = raw.len(), "writing cache entry");
        self.cache.set(kind, symbol, raw).await?;
        Ok(())
    }
}

impl std::fmt::Debug for MarketDataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataService")
            .field("sources", &self.sources)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Union of line-item records per report period; values from `incoming` win.
fn merge_line_items(cached: Vec<LineItem>, incoming: Vec<LineItem>) -> Vec<LineItem> {
    let mut merged: BTreeMap<(Date, PeriodKind), LineItem> = BTreeMap::new();
    for item in cached.into_iter().chain(incoming) {
        match merged.get_mut(&item.key()) {
            Some(existing) => {
                existing.currency = item.currency.or(existing.currency.take());
                existing.values.extend(item.values);
            }
            None => {
                merged.insert(item.key(), item);
            }
        }
    }
    merged.into_values().collect()
}
