//! Range reconciliation: coverage decisions, fetch planning and merging.
//!
//! Everything here is pure. The service feeds in cached and fetched records
//! and gets back the caller-visible selection or the set to write back.
//!
//! Coverage is deliberately coarse: any cached record inside the requested
//! window counts as a hit, with no gap detection.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use time::Date;

use crate::data_source::PriceQuery;
use crate::{
    AssetClass, CompanyNewsItem, DateWindow, FinancialMetric, InsiderTrade, LineItem, PeriodKind,
    PricePoint, SecurityId,
};

/// Which records answer a request, in what order, and how many.
pub trait Criteria<R> {
    fn matches(&self, record: &R) -> bool;

    /// Presentation order of the selection.
    fn order(&self, left: &R, right: &R) -> Ordering;

    fn limit(&self) -> Option<usize> {
        None
    }
}

/// Records matching `criteria`, ordered and truncated.
pub fn select<R, C>(records: &[R], criteria: &C) -> Vec<R>
where
    R: Clone,
    C: Criteria<R>,
{
    let mut selected = records
        .iter()
        .filter(|record| criteria.matches(record))
        .cloned()
        .collect::<Vec<_>>();
    selected.sort_by(|left, right| criteria.order(left, right));
    if let Some(limit) = criteria.limit() {
        selected.truncate(limit);
    }
    selected
}

/// The selection when it is non-empty, else `None` (a cache miss).
pub fn coarse_hit<R, C>(cached: &[R], criteria: &C) -> Option<Vec<R>>
where
    R: Clone,
    C: Criteria<R>,
{
    let selected = select(cached, criteria);
    (!selected.is_empty()).then_some(selected)
}

/// Union of `cached` and `incoming` keyed by `key`, ascending by key.
///
/// On equal keys the incoming record supersedes the cached one.
pub fn merge_by_key<R, K, F>(cached: Vec<R>, incoming: Vec<R>, key: F) -> Vec<R>
where
    K: Ord,
    F: Fn(&R) -> K,
{
    let mut merged = BTreeMap::new();
    for record in cached.into_iter().chain(incoming) {
        merged.insert(key(&record), record);
    }
    merged.into_values().collect()
}

/// Remote request issued on a price cache miss.
///
/// Domestic equities always fetch from `anchor` so one fetch fills the
/// cache with the full history; foreign equities fetch exactly the window;
/// derivatives fetch everything the provider has up to the end date.
pub fn plan_price_fetch(security: &SecurityId, window: &DateWindow, anchor: Date) -> PriceQuery {
    let start = match security.asset_class {
        AssetClass::EquityDomestic => Some(anchor.min(window.end())),
        AssetClass::EquityForeign => window.start(),
        AssetClass::Derivative => None,
    };

    PriceQuery {
        symbol: security.symbol.clone(),
        start,
        end: window.end(),
    }
}

/// Price points inside a window, ascending.
#[derive(Debug, Clone, Copy)]
pub struct PriceCriteria {
    pub window: DateWindow,
}

impl Criteria<PricePoint> for PriceCriteria {
    fn matches(&self, record: &PricePoint) -> bool {
        self.window.contains(record.time)
    }

    fn order(&self, left: &PricePoint, right: &PricePoint) -> Ordering {
        left.time.cmp(&right.time)
    }
}

/// Most recent metrics of one period kind reported on or before `end`.
#[derive(Debug, Clone, Copy)]
pub struct MetricCriteria {
    pub end: Date,
    pub period: PeriodKind,
    pub limit: usize,
}

impl Criteria<FinancialMetric> for MetricCriteria {
    fn matches(&self, record: &FinancialMetric) -> bool {
        record.report_period <= self.end && record.period == self.period
    }

    fn order(&self, left: &FinancialMetric, right: &FinancialMetric) -> Ordering {
        right.report_period.cmp(&left.report_period)
    }

    fn limit(&self) -> Option<usize> {
        Some(self.limit)
    }
}

/// Line-item records carrying every requested name.
#[derive(Debug, Clone)]
pub struct LineItemCriteria {
    pub end: Date,
    pub period: PeriodKind,
    pub line_items: Vec<String>,
    pub limit: usize,
}

impl Criteria<LineItem> for LineItemCriteria {
    fn matches(&self, record: &LineItem) -> bool {
        record.report_period <= self.end
            && record.period == self.period
            && record.has_all(&self.line_items)
    }

    fn order(&self, left: &LineItem, right: &LineItem) -> Ordering {
        right.report_period.cmp(&left.report_period)
    }

    fn limit(&self) -> Option<usize> {
        Some(self.limit)
    }
}

/// Insider trades whose effective date falls in the window, newest first.
#[derive(Debug, Clone, Copy)]
pub struct InsiderTradeCriteria {
    pub window: DateWindow,
}

impl Criteria<InsiderTrade> for InsiderTradeCriteria {
    fn matches(&self, record: &InsiderTrade) -> bool {
        self.window.contains_date(record.effective_date())
    }

    fn order(&self, left: &InsiderTrade, right: &InsiderTrade) -> Ordering {
        right
            .effective_date()
            .cmp(&left.effective_date())
            .then_with(|| right.filing_date.cmp(&left.filing_date))
    }
}

/// News inside the window, newest first.
#[derive(Debug, Clone, Copy)]
pub struct NewsCriteria {
    pub window: DateWindow,
    pub limit: usize,
}

impl Criteria<CompanyNewsItem> for NewsCriteria {
    fn matches(&self, record: &CompanyNewsItem) -> bool {
        self.window.contains(record.date)
    }

    fn order(&self, left: &CompanyNewsItem, right: &CompanyNewsItem) -> Ordering {
        right.date.cmp(&left.date)
    }

    fn limit(&self) -> Option<usize> {
        Some(self.limit)
    }
}
