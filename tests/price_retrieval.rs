//! Behaviour tests for cache-aware price retrieval.

mod common;

use std::sync::Arc;

use ferrofeed_core::normalize::encode_records;
use ferrofeed_core::{
    AssetClass, CacheGateway, CacheMode, EntityKind, MarketTime, MemoryCache, PricePoint,
    PriceRequest, RetrievalError, SourceSet,
};
use serde_json::json;
use time::macros::{date, datetime};

use common::{domestic_bar, nothing_cached, row, security, service, symbol, StubPrices};

fn cached_point(day: time::Date, close: f64) -> PricePoint {
    PricePoint::new(MarketTime::day(day), close, close + 1.0, close - 1.0, close, 500)
        .expect("valid point")
}

async fn seed(cache: &MemoryCache, raw_symbol: &str, points: &[PricePoint]) {
    cache
        .set(
            EntityKind::Prices,
            &symbol(raw_symbol),
            encode_records(points).expect("encode"),
        )
        .await
        .expect("seed cache");
}

#[tokio::test]
async fn empty_cache_is_filled_from_remote_and_returned_ascending() {
    // Given: an empty cache and a provider with three January bars (out of order)
    let cache = Arc::new(MemoryCache::new());
    let prices = Arc::new(StubPrices::new(
        AssetClass::EquityDomestic,
        vec![
            domestic_bar("2024-01-04", 12.0),
            domestic_bar("2024-01-02", 10.0),
            domestic_bar("2024-01-03", 11.0),
        ],
    ));
    let service = service(
        cache.clone(),
        SourceSet::builder().with_price_source(prices.clone()).build(),
    );

    // When: the user asks for the whole of January
    let request = PriceRequest::new(
        security("600519", AssetClass::EquityDomestic),
        date!(2024 - 01 - 01),
        date!(2024 - 01 - 31),
    )
    .expect("request");
    let points = service.get_prices(&request).await.expect("prices");

    // Then: three points come back in chronological order
    let days = points.iter().map(|point| point.time.date()).collect::<Vec<_>>();
    assert_eq!(
        days,
        vec![date!(2024 - 01 - 02), date!(2024 - 01 - 03), date!(2024 - 01 - 04)]
    );
    assert_eq!(points[0].close, 10.0);

    // And: the domestic fetch was anchored at the configured history start
    let query = prices.last_query().expect("one fetch");
    assert_eq!(query.start, Some(date!(2015 - 04 - 01)));
    assert_eq!(query.end, date!(2024 - 01 - 31));

    // And: the cache now holds all three bars
    let stored = cache
        .get(EntityKind::Prices, &symbol("600519"))
        .await
        .expect("cache read")
        .expect("entry written");
    assert_eq!(stored.len(), 3);
}

#[tokio::test]
async fn one_cached_point_in_window_answers_without_remote_call() {
    // Given: the cache holds a single bar on 2024-01-15
    let cache = Arc::new(MemoryCache::new());
    seed(&cache, "600519", &[cached_point(date!(2024 - 01 - 15), 20.0)]).await;
    let prices = Arc::new(StubPrices::new(
        AssetClass::EquityDomestic,
        vec![domestic_bar("2024-01-02", 10.0)],
    ));
    let service = service(
        cache.clone(),
        SourceSet::builder().with_price_source(prices.clone()).build(),
    );

    // When: January is requested
    let request = PriceRequest::new(
        security("600519", AssetClass::EquityDomestic),
        date!(2024 - 01 - 01),
        date!(2024 - 01 - 31),
    )
    .expect("request");
    let points = service.get_prices(&request).await.expect("prices");

    // Then: exactly the cached bar is returned and the provider is never called
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].time.date(), date!(2024 - 01 - 15));
    assert_eq!(prices.calls(), 0);
}

#[tokio::test]
async fn empty_remote_result_is_data_unavailable_and_cache_untouched() {
    // Given: an empty cache and a provider with nothing to say
    let cache = Arc::new(MemoryCache::new());
    let prices = Arc::new(StubPrices::new(AssetClass::EquityDomestic, Vec::new()));
    let service = service(
        cache.clone(),
        SourceSet::builder().with_price_source(prices).build(),
    );

    // When: prices are requested
    let request = PriceRequest::new(
        security("600519", AssetClass::EquityDomestic),
        date!(2024 - 01 - 01),
        date!(2024 - 01 - 31),
    )
    .expect("request");
    let error = service.get_prices(&request).await.expect_err("no data");

    // Then: the failure names the kind and nothing was written
    assert!(matches!(
        error,
        RetrievalError::DataUnavailable {
            kind: EntityKind::Prices,
            ..
        }
    ));
    assert!(nothing_cached(&cache, EntityKind::Prices, "600519").await);
}

#[tokio::test]
async fn repeated_request_returns_identical_points_from_cache() {
    // Given: a provider whose history extends beyond the requested window
    let cache = Arc::new(MemoryCache::new());
    let prices = Arc::new(StubPrices::new(
        AssetClass::EquityDomestic,
        vec![
            domestic_bar("2023-12-29", 9.0),
            domestic_bar("2024-01-02", 10.0),
            domestic_bar("2024-01-03", 11.0),
        ],
    ));
    let service = service(
        cache.clone(),
        SourceSet::builder().with_price_source(prices.clone()).build(),
    );
    let request = PriceRequest::new(
        security("600519", AssetClass::EquityDomestic),
        date!(2024 - 01 - 01),
        date!(2024 - 01 - 31),
    )
    .expect("request");

    // When: the same request is made twice
    let first = service.get_prices(&request).await.expect("first");
    let second = service.get_prices(&request).await.expect("second");

    // Then: both answers are the in-window selection and only one fetch happened
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert_eq!(prices.calls(), 1);

    // And: the out-of-window bar is still kept in the cache
    let stored = cache
        .get(EntityKind::Prices, &symbol("600519"))
        .await
        .expect("cache read")
        .expect("entry");
    assert_eq!(stored.len(), 3);
}

#[tokio::test]
async fn bypass_fetches_and_leaves_cache_alone() {
    // Given: a cached bar that would satisfy the window
    let cache = Arc::new(MemoryCache::new());
    seed(&cache, "600519", &[cached_point(date!(2024 - 01 - 15), 20.0)]).await;
    let prices = Arc::new(StubPrices::new(
        AssetClass::EquityDomestic,
        vec![domestic_bar("2024-01-02", 10.0)],
    ));
    let service = service(
        cache.clone(),
        SourceSet::builder().with_price_source(prices.clone()).build(),
    );

    // When: the request bypasses the cache
    let request = PriceRequest::new(
        security("600519", AssetClass::EquityDomestic),
        date!(2024 - 01 - 01),
        date!(2024 - 01 - 31),
    )
    .expect("request")
    .with_mode(CacheMode::Bypass);
    let points = service.get_prices(&request).await.expect("prices");

    // Then: only the remote bar is returned and the cached entry is unchanged
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].time.date(), date!(2024 - 01 - 02));
    assert_eq!(prices.calls(), 1);
    let stored = cache
        .get(EntityKind::Prices, &symbol("600519"))
        .await
        .expect("cache read")
        .expect("entry");
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn refresh_fetches_and_merges_into_existing_entry() {
    // Given: a cached bar whose close the provider has since revised
    let cache = Arc::new(MemoryCache::new());
    seed(
        &cache,
        "600519",
        &[
            cached_point(date!(2023 - 06 - 01), 5.0),
            cached_point(date!(2024 - 01 - 02), 99.0),
        ],
    )
    .await;
    let prices = Arc::new(StubPrices::new(
        AssetClass::EquityDomestic,
        vec![domestic_bar("2024-01-02", 10.0), domestic_bar("2024-01-03", 11.0)],
    ));
    let service = service(
        cache.clone(),
        SourceSet::builder().with_price_source(prices.clone()).build(),
    );

    // When: a refresh is requested
    let request = PriceRequest::new(
        security("600519", AssetClass::EquityDomestic),
        date!(2024 - 01 - 01),
        date!(2024 - 01 - 31),
    )
    .expect("request")
    .with_mode(CacheMode::Refresh);
    let points = service.get_prices(&request).await.expect("prices");

    // Then: the provider's values win
    assert_eq!(prices.calls(), 1);
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].close, 10.0);

    // And: the older cached bar survives the merge
    let stored = cache
        .get(EntityKind::Prices, &symbol("600519"))
        .await
        .expect("cache read")
        .expect("entry");
    assert_eq!(stored.len(), 3);
}

#[tokio::test]
async fn foreign_equities_fetch_exactly_the_window() {
    // Given: a foreign equity provider using one-letter columns
    let cache = Arc::new(MemoryCache::new());
    let prices = Arc::new(StubPrices::new(
        AssetClass::EquityForeign,
        vec![row(json!({"d": "2024-01-02", "o": "185.0", "h": "188.4", "l": "183.9", "c": "185.6", "v": "82488700"}))],
    ));
    let service = service(
        cache,
        SourceSet::builder().with_price_source(prices.clone()).build(),
    );

    // When: a one-week window is requested
    let request = PriceRequest::new(
        security("AAPL", AssetClass::EquityForeign),
        date!(2024 - 01 - 01),
        date!(2024 - 01 - 07),
    )
    .expect("request");
    let points = service.get_prices(&request).await.expect("prices");

    // Then: the fetch is bounded by the window and the volume is integral
    let query = prices.last_query().expect("fetched");
    assert_eq!(query.start, Some(date!(2024 - 01 - 01)));
    assert_eq!(points[0].volume, 82_488_700);
}

#[tokio::test]
async fn derivatives_fetch_full_history_at_intraday_resolution() {
    // Given: a derivative provider returning 15-minute bars
    let cache = Arc::new(MemoryCache::new());
    let prices = Arc::new(StubPrices::new(
        AssetClass::Derivative,
        vec![
            row(json!({"d": "2024-01-05 14:45:00", "o": 3900, "h": 3910, "l": 3890, "c": 3905, "v": 1200})),
            row(json!({"d": "2024-01-05 14:30:00", "o": 3895, "h": 3902, "l": 3891, "c": 3900, "v": 800})),
        ],
    ));
    let service = service(
        cache,
        SourceSet::builder().with_price_source(prices.clone()).build(),
    );

    // When: the trading day is requested
    let request = PriceRequest::new(
        security("RB0", AssetClass::Derivative),
        date!(2024 - 01 - 05),
        date!(2024 - 01 - 05),
    )
    .expect("request");
    let points = service.get_prices(&request).await.expect("prices");

    // Then: no lower bound is sent and the intraday timestamps are kept
    assert_eq!(prices.last_query().expect("fetched").start, None);
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].time.datetime(), datetime!(2024 - 01 - 05 14:30:00));
    assert_eq!(points[1].time.to_compact(), "20240105144500");
}

#[tokio::test]
async fn remote_failure_propagates_with_status() {
    // Given: a provider that answers 503
    let cache = Arc::new(MemoryCache::new());
    let prices = Arc::new(StubPrices::failing(AssetClass::EquityDomestic, 503));
    let service = service(
        cache.clone(),
        SourceSet::builder().with_price_source(prices).build(),
    );

    // When: prices are requested
    let request = PriceRequest::new(
        security("600519", AssetClass::EquityDomestic),
        date!(2024 - 01 - 01),
        date!(2024 - 01 - 31),
    )
    .expect("request");
    let error = service.get_prices(&request).await.expect_err("remote failure");

    // Then: the status survives and the cache stays empty
    assert!(matches!(error, RetrievalError::RemoteRequestFailed { .. }));
    assert_eq!(error.status(), Some(503));
    assert!(nothing_cached(&cache, EntityKind::Prices, "600519").await);
}

#[tokio::test]
async fn missing_price_source_is_reported() {
    // Given: no price source for derivatives
    let service = service(Arc::new(MemoryCache::new()), SourceSet::default());

    // When: derivative prices are requested
    let request = PriceRequest::new(
        security("RB0", AssetClass::Derivative),
        date!(2024 - 01 - 01),
        date!(2024 - 01 - 31),
    )
    .expect("request");
    let error = service.get_prices(&request).await.expect_err("no source");

    // Then: the error names the asset class
    assert!(matches!(
        error,
        RetrievalError::SourceNotRegistered {
            asset_class: Some(AssetClass::Derivative),
            ..
        }
    ));
}

#[tokio::test]
async fn price_frame_exposes_columns() {
    // Given: three bars from the provider
    let prices = Arc::new(StubPrices::new(
        AssetClass::EquityDomestic,
        vec![
            domestic_bar("2024-01-02", 10.0),
            domestic_bar("2024-01-03", 11.0),
            domestic_bar("2024-01-04", 12.0),
        ],
    ));
    let service = service(
        Arc::new(MemoryCache::new()),
        SourceSet::builder().with_price_source(prices).build(),
    );

    // When: a frame is requested
    let request = PriceRequest::new(
        security("600519", AssetClass::EquityDomestic),
        date!(2024 - 01 - 01),
        date!(2024 - 01 - 31),
    )
    .expect("request");
    let frame = service.get_price_frame(&request).await.expect("frame");

    // Then: the close column follows the time index
    assert_eq!(frame.len(), 3);
    assert_eq!(frame.column("close"), Some(&[10.0, 11.0, 12.0][..]));
    assert_eq!(frame.column("volume"), Some(&[10_000.0, 10_000.0, 10_000.0][..]));
}
