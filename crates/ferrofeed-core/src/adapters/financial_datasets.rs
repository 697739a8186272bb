use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use super::fetch_body;
use crate::data_source::{
    FundamentalsSource, InsiderTradeQuery, InsiderTradeSource, LineItemQuery, MetricsQuery,
    RawRow, SourceError, SourceFuture,
};
use crate::domain::format_date;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};

const PROVIDER: &str = "financialdatasets";
const DEFAULT_BASE_URL: &str = "https://api.financialdatasets.ai";

/// financialdatasets.ai REST API: metrics, line-item search and insider trades.
#[derive(Clone)]
pub struct FinancialDatasetsAdapter {
    http_client: Arc<dyn HttpClient>,
    auth: HttpAuth,
    base_url: String,
    timeout_ms: u64,
}

impl FinancialDatasetsAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, auth: HttpAuth, timeout_ms: u64) -> Self {
        Self {
            http_client,
            auth,
            base_url: String::from(DEFAULT_BASE_URL),
            timeout_ms,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    fn metrics_request(&self, query: &MetricsQuery) -> HttpRequest {
        HttpRequest::get(format!("{}/financial-metrics/", self.base_url))
            .with_query("ticker", query.symbol.as_str())
            .with_query("report_period_lte", format_date(query.end))
            .with_query("limit", query.limit.to_string())
            .with_query("period", query.period.as_str())
            .with_auth(&self.auth)
            .with_timeout_ms(self.timeout_ms)
    }

    fn line_items_request(&self, query: &LineItemQuery) -> HttpRequest {
        let body = json!({
            "tickers": [query.symbol.as_str()],
            "line_items": query.line_items,
            "end_date": format_date(query.end),
            "period": query.period.as_str(),
            "limit": query.limit,
        });

        HttpRequest::post(format!("{}/financials/search/line-items", self.base_url))
            .with_json_body(&body)
            .with_auth(&self.auth)
            .with_timeout_ms(self.timeout_ms)
    }

    fn insider_trades_request(&self, query: &InsiderTradeQuery) -> HttpRequest {
        let mut request = HttpRequest::get(format!("{}/insider-trades/", self.base_url))
            .with_query("ticker", query.symbol.as_str())
            .with_query("filing_date_lte", format_date(query.filing_date_lte));
        if let Some(gte) = query.filing_date_gte {
            request = request.with_query("filing_date_gte", format_date(gte));
        }

        request
            .with_query("limit", query.limit.to_string())
            .with_auth(&self.auth)
            .with_timeout_ms(self.timeout_ms)
    }

    async fn rows<E, F>(&self, request: HttpRequest, extract: F) -> Result<Vec<RawRow>, SourceError>
    where
        E: for<'de> Deserialize<'de>,
        F: FnOnce(E) -> Vec<RawRow>,
    {
        let body = fetch_body(self.http_client.as_ref(), PROVIDER, request).await?;
        let envelope: E = serde_json::from_str(&body)
            .map_err(|e| SourceError::decode(format!("failed to parse {PROVIDER} response: {e}")))?;
        Ok(extract(envelope))
    }
}

#[derive(Debug, Deserialize)]
struct MetricsEnvelope {
    #[serde(default)]
    financial_metrics: Vec<RawRow>,
}

#[derive(Debug, Deserialize)]
struct LineItemsEnvelope {
    #[serde(default)]
    search_results: Vec<RawRow>,
}

#[derive(Debug, Deserialize)]
struct InsiderTradesEnvelope {
    #[serde(default)]
    insider_trades: Vec<RawRow>,
}

impl FundamentalsSource for FinancialDatasetsAdapter {
    fn fetch_financial_metrics<'a>(
        &'a self,
        query: &'a MetricsQuery,
    ) -> SourceFuture<'a, Vec<RawRow>> {
        Box::pin(self.rows(self.metrics_request(query), |envelope: MetricsEnvelope| {
            envelope.financial_metrics
        }))
    }

    fn search_line_items<'a>(&'a self, query: &'a LineItemQuery) -> SourceFuture<'a, Vec<RawRow>> {
        Box::pin(self.rows(self.line_items_request(query), |envelope: LineItemsEnvelope| {
            envelope.search_results
        }))
    }
}

impl InsiderTradeSource for FinancialDatasetsAdapter {
    fn fetch_insider_trades<'a>(
        &'a self,
        query: &'a InsiderTradeQuery,
    ) -> SourceFuture<'a, Vec<RawRow>> {
        Box::pin(self.rows(
            self.insider_trades_request(query),
            |envelope: InsiderTradesEnvelope| envelope.insider_trades,
        ))
    }
}
