//! Behaviour tests for insider-trade pagination.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use ferrofeed_core::{
    CacheMode, InsiderTradePager, InsiderTradeRequest, MemoryCache, SourceSet,
};
use proptest::prelude::*;
use time::macros::date;
use time::Duration;

use common::{service, symbol, DailyFilings};

#[tokio::test]
async fn window_spanning_three_pages_is_collected_completely() {
    // Given: 2500 filings, one per day, all inside the requested window
    let filings = Arc::new(DailyFilings::new(date!(2024 - 06 - 30), 2_500));
    let start = filings.oldest().expect("oldest");
    let service = service(
        Arc::new(MemoryCache::new()),
        SourceSet::builder()
            .with_insider_trade_source(filings.clone())
            .build(),
    );

    // When: the window is requested with the provider's page size of 1000
    let request = InsiderTradeRequest::new(symbol("AAPL"), Some(start), date!(2024 - 06 - 30))
        .expect("request")
        .with_page_limit(1_000)
        .expect("page limit");
    let trades = service.get_insider_trades(&request).await.expect("trades");

    // Then: exactly three pages were requested
    assert_eq!(filings.calls(), 3);

    // And: every filing appears once, newest first
    assert_eq!(trades.len(), 2_500);
    let unique = trades
        .iter()
        .map(|trade| trade.identity())
        .collect::<HashSet<_>>();
    assert_eq!(unique.len(), 2_500);
    assert!(trades
        .windows(2)
        .all(|pair| pair[0].effective_date() >= pair[1].effective_date()));
    assert_eq!(trades[0].filing_date, date!(2024 - 06 - 30));
    assert_eq!(trades[2_499].filing_date, start);
}

#[tokio::test]
async fn without_start_only_the_newest_page_is_fetched() {
    // Given: more filings than one page holds
    let filings = Arc::new(DailyFilings::new(date!(2024 - 06 - 30), 150));
    let service = service(
        Arc::new(MemoryCache::new()),
        SourceSet::builder()
            .with_insider_trade_source(filings.clone())
            .build(),
    );

    // When: no start date is given
    let request = InsiderTradeRequest::new(symbol("AAPL"), None, date!(2024 - 06 - 30))
        .expect("request")
        .with_page_limit(100)
        .expect("page limit");
    let trades = service.get_insider_trades(&request).await.expect("trades");

    // Then: a single page answers
    assert_eq!(filings.calls(), 1);
    assert_eq!(trades.len(), 100);
}

#[tokio::test]
async fn cached_window_is_served_without_paging() {
    // Given: a first request that filled the cache
    let filings = Arc::new(DailyFilings::new(date!(2024 - 06 - 30), 40));
    let service = service(
        Arc::new(MemoryCache::new()),
        SourceSet::builder()
            .with_insider_trade_source(filings.clone())
            .build(),
    );
    let request = InsiderTradeRequest::new(
        symbol("AAPL"),
        Some(date!(2024 - 06 - 01)),
        date!(2024 - 06 - 30),
    )
    .expect("request");
    let first = service.get_insider_trades(&request).await.expect("first");

    // When: a narrower window inside it is requested
    let narrower = InsiderTradeRequest::new(
        symbol("AAPL"),
        Some(date!(2024 - 06 - 20)),
        date!(2024 - 06 - 30),
    )
    .expect("request");
    let second = service.get_insider_trades(&narrower).await.expect("second");

    // Then: the cache answers and no more pages are requested
    assert_eq!(first.len(), 30);
    assert_eq!(second.len(), 11);
    assert_eq!(filings.calls(), 1);

    // And: a refresh goes back to the provider
    let refreshed = service
        .get_insider_trades(&narrower.with_mode(CacheMode::Refresh))
        .await
        .expect("refresh");
    assert_eq!(refreshed.len(), 11);
    assert_eq!(filings.calls(), 2);
}

#[test]
fn zero_page_limit_is_rejected() {
    let request = InsiderTradeRequest::new(symbol("AAPL"), None, date!(2024 - 06 - 30))
        .expect("request");
    assert!(request.with_page_limit(0).is_err());
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
}

/// Worst-case remote calls for `count` daily filings: a full page adds at
/// most `limit - 1` new trades because the inclusive cutoff repeats the
/// boundary day, and one closing call may find only that boundary.
fn call_bound(count: usize, limit: usize) -> usize {
    count.saturating_sub(1).div_ceil(limit - 1) + 1
}

#[tokio::test]
async fn long_window_repeats_one_boundary_trade_per_page() {
    // Given: 200 daily filings and a page size of 10
    let filings = DailyFilings::new(date!(2024 - 06 - 30), 200);
    let start = filings.oldest().expect("oldest");

    // When: the whole window is collected
    let collected = InsiderTradePager::new(&filings, 10)
        .expect("pager")
        .collect(&symbol("AAPL"), date!(2024 - 06 - 30), Some(start))
        .await
        .expect("collect");

    // Then: every page after the first adds nine new trades
    assert_eq!(collected.trades.len(), 200);
    assert_eq!(collected.calls, 23);
    assert_eq!(filings.calls(), 23);
    assert!(collected.calls <= call_bound(200, 10));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn pagination_terminates_without_duplicates(
        limit in 2usize..40,
        count in 0usize..400,
        slack in 0i64..3,
    ) {
        let newest = date!(2024 - 06 - 30);
        let filings = DailyFilings::new(newest, count);
        let start = filings.oldest().unwrap_or(newest) - Duration::days(slack);
        let ticker = symbol("AAPL");

        let collected = runtime()
            .block_on(async {
                InsiderTradePager::new(&filings, limit)
                    .expect("pager")
                    .collect(&ticker, newest, Some(start))
                    .await
            })
            .expect("collect");

        let unique = collected
            .trades
            .iter()
            .map(|trade| trade.identity())
            .collect::<HashSet<_>>();
        prop_assert_eq!(unique.len(), collected.trades.len());
        prop_assert_eq!(collected.trades.len(), count);
        prop_assert!(collected.calls <= call_bound(count, limit));
    }
}
