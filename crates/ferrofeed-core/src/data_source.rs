//! Remote collaborator contracts and their request types.
//!
//! Sources return raw tabular rows in the provider's own schema; mapping
//! onto canonical records is the job of [`crate::normalize`].
//!
//! | Trait | Query | Provides |
//! |-------|-------|----------|
//! | [`PriceSource`] | [`PriceQuery`] | OHLCV rows for one asset class |
//! | [`FundamentalsSource`] | [`MetricsQuery`], [`LineItemQuery`] | metric and line-item rows |
//! | [`InsiderTradeSource`] | [`InsiderTradeQuery`] | one page of insider trades |
//! | [`NewsSource`] | [`NewsQuery`] | news rows for one asset class |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use time::Date;

use crate::http_client::HttpError;
use crate::{AssetClass, PeriodKind, Symbol};

/// One provider row: column name to cell value.
pub type RawRow = serde_json::Map<String, serde_json::Value>;

/// Boxed future returned by source operations.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    Decode,
}

/// Structured source error carrying the provider's HTTP status when it answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    status: Option<u16>,
}

impl SourceError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            status: None,
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Decode,
            message: message.into(),
            status: None,
        }
    }

    /// Classify a non-success HTTP answer.
    pub fn from_status(provider: &str, status: u16, body: &str) -> Self {
        let kind = match status {
            429 => SourceErrorKind::RateLimited,
            400..=499 => SourceErrorKind::InvalidRequest,
            _ => SourceErrorKind::Unavailable,
        };
        let detail = body.trim();
        let message = if detail.is_empty() {
            format!("{provider} returned status {status}")
        } else {
            let snippet: String = detail.chars().take(200).collect();
            format!("{provider} returned status {status}: {snippet}")
        };

        Self {
            kind,
            message,
            status: Some(status),
        }
    }

    pub fn transport(provider: &str, error: &HttpError) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: format!("{provider} transport error: {}", error.message()),
            status: None,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Decode => "source.decode",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Price fetch plan. `start: None` asks for the provider's full history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuery {
    pub symbol: Symbol,
    pub start: Option<Date>,
    pub end: Date,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsQuery {
    pub symbol: Symbol,
    pub end: Date,
    pub period: PeriodKind,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemQuery {
    pub symbol: Symbol,
    pub line_items: Vec<String>,
    pub end: Date,
    pub period: PeriodKind,
    pub limit: usize,
}

/// One page request: at most `limit` trades filed within `[filing_date_gte, filing_date_lte]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsiderTradeQuery {
    pub symbol: Symbol,
    pub filing_date_lte: Date,
    pub filing_date_gte: Option<Date>,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsQuery {
    pub symbol: Symbol,
    pub end: Date,
}

/// OHLCV provider for one asset class.
pub trait PriceSource: Send + Sync {
    fn asset_class(&self) -> AssetClass;

    /// Rows in provider schema, in any order.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] on transport failure, a non-success status, or
    /// an undecodable body.
    fn fetch_prices<'a>(&'a self, query: &'a PriceQuery) -> SourceFuture<'a, Vec<RawRow>>;
}

/// Provider of financial metrics and statement line items.
pub trait FundamentalsSource: Send + Sync {
    fn fetch_financial_metrics<'a>(&'a self, query: &'a MetricsQuery)
        -> SourceFuture<'a, Vec<RawRow>>;

    fn search_line_items<'a>(&'a self, query: &'a LineItemQuery) -> SourceFuture<'a, Vec<RawRow>>;
}

/// Page-at-a-time provider of insider trades, newest filings first.
pub trait InsiderTradeSource: Send + Sync {
    fn fetch_insider_trades<'a>(
        &'a self,
        query: &'a InsiderTradeQuery,
    ) -> SourceFuture<'a, Vec<RawRow>>;
}

/// Company news provider for one asset class.
pub trait NewsSource: Send + Sync {
    fn asset_class(&self) -> AssetClass;

    fn fetch_news<'a>(&'a self, query: &'a NewsQuery) -> SourceFuture<'a, Vec<RawRow>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_http_statuses() {
        let throttled = SourceError::from_status("financialdatasets", 429, "slow down");
        assert_eq!(throttled.kind(), SourceErrorKind::RateLimited);
        assert_eq!(throttled.status(), Some(429));

        let unauthorized = SourceError::from_status("financialdatasets", 401, "");
        assert_eq!(unauthorized.code(), "source.invalid_request");
        assert_eq!(unauthorized.message(), "financialdatasets returned status 401");

        let outage = SourceError::from_status("eastmoney", 503, "<html>");
        assert_eq!(outage.kind(), SourceErrorKind::Unavailable);
    }

    #[test]
    fn transport_errors_carry_no_status() {
        let error = SourceError::transport("sina", &HttpError::new("request timeout"));
        assert_eq!(error.status(), None);
        assert_eq!(error.to_string(), "sina transport error: request timeout (source.unavailable)");
    }
}
