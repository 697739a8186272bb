//! Cutoff-narrowing pagination for insider trades.
//!
//! The provider only answers "at most `limit` trades filed on or before a
//! date", so a window is walked backwards by moving the cutoff to the
//! earliest filing date of each page. The cutoff is inclusive, which means
//! boundary-date trades come back twice; they are dropped by identity.
//!
//! A full page therefore adds at most `limit - 1` new trades. With one trade
//! per filing date, `n` trades take at most `ceil((n - 1) / (limit - 1)) + 1`
//! calls, the last of which may return only the boundary trade.

use std::collections::HashSet;

use time::Date;
use tracing::{debug, instrument};

use crate::cache::EntityKind;
use crate::data_source::{InsiderTradeQuery, InsiderTradeSource};
use crate::normalize::normalize_records;
use crate::{InsiderTrade, RetrievalError, Symbol, ValidationError};

/// Result of a paginated collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedTrades {
    /// Trades in the order pages returned them, without duplicates.
    pub trades: Vec<InsiderTrade>,
    /// Remote calls issued.
    pub calls: usize,
}

/// Drives repeated page requests against an [`InsiderTradeSource`].
pub struct InsiderTradePager<'a> {
    source: &'a dyn InsiderTradeSource,
    limit: usize,
}

impl<'a> InsiderTradePager<'a> {
    pub fn new(source: &'a dyn InsiderTradeSource, limit: usize) -> Result<Self, ValidationError> {
        if limit == 0 {
            return Err(ValidationError::ZeroLimit);
        }
        Ok(Self { source, limit })
    }

    /// Collect every trade filed in `[start, end]`.
    ///
    /// Without a `start` only the first page is fetched.
    #[instrument(skip(self), fields(limit = self.limit))]
    pub async fn collect(
        &self,
        symbol: &Symbol,
        end: Date,
        start: Option<Date>,
    ) -> Result<CollectedTrades, RetrievalError> {
        let mut cursor = end;
        let mut calls = 0usize;
        let mut seen = HashSet::new();
        let mut trades = Vec::new();

        loop {
            let query = InsiderTradeQuery {
                symbol: symbol.clone(),
                filing_date_lte: cursor,
                filing_date_gte: start,
                limit: self.limit,
            };
            let rows = self
                .source
                .fetch_insider_trades(&query)
                .await
                .map_err(|source| RetrievalError::remote(symbol, source))?;
            calls += 1;

            let page_len = rows.len();
            let page: Vec<InsiderTrade> = normalize_records(EntityKind::InsiderTrades, rows);
            if page.is_empty() {
                debug!(calls, "empty page");
                break;
            }

            let earliest = page.iter().map(|trade| trade.filing_date).min();
            let before = trades.len();
            for trade in page {
                if seen.insert(trade.identity()) {
                    trades.push(trade);
                }
            }
            debug!(
                calls,
                %cursor,
                page_len,
                added = trades.len() - before,
                "insider trade page"
            );

            let Some(start) = start else { break };
            if page_len < self.limit {
                break;
            }

            let Some(next) = earliest else { break };
            if next >= cursor {
                // The next request would repeat this one.
                debug!(%next, "cutoff did not move");
                break;
            }
            if next <= start {
                break;
            }
            cursor = next;
        }

        Ok(CollectedTrades { trades, calls })
    }
}
