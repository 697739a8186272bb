//! Contract tests: provider adapters behind the retrieval service, driven by
//! scripted HTTP responses.

mod common;

use std::sync::Arc;

use ferrofeed_core::{
    AssetClass, EastmoneyAdapter, FinancialDatasetsAdapter, HttpAuth, HttpError, HttpMethod,
    HttpResponse, InsiderTradeRequest, MemoryCache, NewsRequest, PriceRequest, RetrievalError,
    ScriptedHttpClient, SinaAdapter, SourceErrorKind, SourceSet,
};
use time::macros::date;

use common::{security, service, symbol};

fn financial_datasets(http: Arc<ScriptedHttpClient>) -> Arc<FinancialDatasetsAdapter> {
    Arc::new(FinancialDatasetsAdapter::new(
        http,
        HttpAuth::api_key_header("X-API-KEY", Some(String::from("test-key"))),
        5_000,
    ))
}

#[tokio::test]
async fn eastmoney_klines_become_domestic_price_points() {
    // Given: the kline endpoint answers with two forward-adjusted bars
    let http = Arc::new(ScriptedHttpClient::new().respond(HttpResponse::ok(
        r#"{"data":{"code":"600519","klines":[
            "2024-01-02,1700.00,1685.01,1709.00,1680.00,32136,5439823872.00,1.70,-1.33,-22.78,0.26",
            "2024-01-03,1681.00,1694.00,1695.00,1676.00,20471,3452934400.00,1.13,0.53,8.99,0.16"
        ]}}"#,
    )));
    let service = service(
        Arc::new(MemoryCache::new()),
        SourceSet::builder()
            .with_price_source(Arc::new(EastmoneyAdapter::new(http.clone(), 5_000)))
            .build(),
    );

    // When: January prices are requested
    let request = PriceRequest::new(
        security("600519", AssetClass::EquityDomestic),
        date!(2024 - 01 - 01),
        date!(2024 - 01 - 31),
    )
    .expect("request");
    let points = service.get_prices(&request).await.expect("prices");

    // Then: the labelled columns land in the right fields
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].open, 1700.0);
    assert_eq!(points[0].close, 1685.01);
    assert_eq!(points[0].high, 1709.0);
    assert_eq!(points[0].volume, 32_136);

    // And: the request targeted the Shanghai listing from the history anchor
    let requests = http.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].query_value("secid"), Some("1.600519"));
    assert_eq!(requests[0].query_value("beg"), Some("20150401"));
    assert_eq!(requests[0].query_value("end"), Some("20240131"));
}

#[tokio::test]
async fn sina_daily_bars_are_bounded_to_the_window() {
    // Given: the feed returns its whole history
    let http = Arc::new(ScriptedHttpClient::new().respond(HttpResponse::ok(
        r#"var _AAPL=([{"d":"2023-12-29","o":"193.90","h":"194.40","l":"191.73","c":"192.53","v":"42628802"},{"d":"2024-01-02","o":"187.15","h":"188.44","l":"183.89","c":"185.64","v":"82488674"}]);"#,
    )));
    let service = service(
        Arc::new(MemoryCache::new()),
        SourceSet::builder()
            .with_price_source(Arc::new(SinaAdapter::new(
                AssetClass::EquityForeign,
                http,
                5_000,
            )))
            .build(),
    );

    // When: the first week of January is requested
    let request = PriceRequest::new(
        security("AAPL", AssetClass::EquityForeign),
        date!(2024 - 01 - 01),
        date!(2024 - 01 - 07),
    )
    .expect("request");
    let points = service.get_prices(&request).await.expect("prices");

    // Then: only the in-window bar survives
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].time.date(), date!(2024 - 01 - 02));
    assert_eq!(points[0].close, 185.64);
}

#[tokio::test]
async fn financial_datasets_metrics_feed_market_cap() {
    // Given: the metrics endpoint returns one snapshot
    let http = Arc::new(ScriptedHttpClient::new().respond(HttpResponse::ok(
        r#"{"financial_metrics":[{"ticker":"AAPL","report_period":"2023-12-30","period":"ttm","currency":"USD","market_cap":2.9e12,"price_to_earnings_ratio":29.4}]}"#,
    )));
    let service = service(
        Arc::new(MemoryCache::new()),
        SourceSet::builder()
            .with_fundamentals_source(financial_datasets(http.clone()))
            .build(),
    );

    // When: market cap is requested
    let market_cap = service
        .get_market_cap(&symbol("AAPL"), date!(2024 - 01 - 01))
        .await
        .expect("market cap");

    // Then: it comes from the snapshot and the key travelled as a header
    assert_eq!(market_cap, Some(2.9e12));
    let requests = http.requests();
    assert_eq!(requests[0].query_value("report_period_lte"), Some("2024-01-01"));
    assert_eq!(requests[0].query_value("period"), Some("ttm"));
    assert_eq!(
        requests[0].headers.get("x-api-key").map(String::as_str),
        Some("test-key")
    );
}

#[tokio::test]
async fn financial_datasets_pages_move_the_filing_cutoff() {
    // Given: pages of two trades, the cutoff day repeated on the next page
    let page = |dates: &[&str]| {
        let trades = dates
            .iter()
            .map(|date| format!(r#"{{"ticker":"AAPL","name":"Jane Officer","filing_date":"{date}"}}"#))
            .collect::<Vec<_>>()
            .join(",");
        HttpResponse::ok(format!(r#"{{"insider_trades":[{trades}]}}"#))
    };
    let http = Arc::new(
        ScriptedHttpClient::new()
            .respond(page(&["2024-06-30", "2024-06-29"]))
            .respond(page(&["2024-06-29", "2024-06-28"]))
            .respond(page(&["2024-06-28"])),
    );
    let service = service(
        Arc::new(MemoryCache::new()),
        SourceSet::builder()
            .with_insider_trade_source(financial_datasets(http.clone()))
            .build(),
    );

    // When: June is requested two trades at a time
    let request = InsiderTradeRequest::new(
        symbol("AAPL"),
        Some(date!(2024 - 06 - 01)),
        date!(2024 - 06 - 30),
    )
    .expect("request")
    .with_page_limit(2)
    .expect("page limit");
    let trades = service.get_insider_trades(&request).await.expect("trades");

    // Then: three trades, each once
    let dates = trades.iter().map(|trade| trade.filing_date).collect::<Vec<_>>();
    assert_eq!(
        dates,
        vec![date!(2024 - 06 - 30), date!(2024 - 06 - 29), date!(2024 - 06 - 28)]
    );

    // And: each page asked for filings on or before the previous page's earliest
    let cutoffs = http
        .requests()
        .iter()
        .map(|request| request.query_value("filing_date_lte").map(str::to_owned))
        .collect::<Vec<_>>();
    assert_eq!(
        cutoffs,
        vec![
            Some(String::from("2024-06-30")),
            Some(String::from("2024-06-29")),
            Some(String::from("2024-06-28")),
        ]
    );
    assert!(http
        .requests()
        .iter()
        .all(|request| request.query_value("filing_date_gte") == Some("2024-06-01")));
}

#[tokio::test]
async fn rate_limited_response_surfaces_status_and_kind() {
    // Given: the provider answers 429
    let http = Arc::new(
        ScriptedHttpClient::new().respond(HttpResponse::new(429, r#"{"error":"slow down"}"#)),
    );
    let service = service(
        Arc::new(MemoryCache::new()),
        SourceSet::builder()
            .with_insider_trade_source(financial_datasets(http.clone()))
            .build(),
    );

    // When: a single page is requested
    let request = InsiderTradeRequest::new(symbol("AAPL"), None, date!(2024 - 06 - 30))
        .expect("request");
    let error = service
        .get_insider_trades(&request)
        .await
        .expect_err("rate limited");

    // Then: the status and classification reach the caller, with no retry
    assert_eq!(error.status(), Some(429));
    match error {
        RetrievalError::RemoteRequestFailed { source, .. } => {
            assert_eq!(source.kind(), SourceErrorKind::RateLimited);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(http.requests().len(), 1);
}

#[tokio::test]
async fn transport_failure_has_no_status() {
    // Given: the connection fails before any response
    let http = Arc::new(ScriptedHttpClient::new().fail(HttpError::new("connection reset")));
    let service = service(
        Arc::new(MemoryCache::new()),
        SourceSet::builder()
            .with_price_source(Arc::new(EastmoneyAdapter::new(http, 5_000)))
            .build(),
    );

    // When
    let request = PriceRequest::new(
        security("000001", AssetClass::EquityDomestic),
        date!(2024 - 01 - 01),
        date!(2024 - 01 - 31),
    )
    .expect("request");
    let error = service.get_prices(&request).await.expect_err("transport");

    // Then
    assert!(matches!(error, RetrievalError::RemoteRequestFailed { .. }));
    assert_eq!(error.status(), None);
}

#[tokio::test]
async fn eastmoney_news_is_renamed_to_canonical_fields() {
    // Given: the search endpoint answers with one highlighted article
    let http = Arc::new(ScriptedHttpClient::new().respond(HttpResponse::ok(
        r#"jQuery_ferrofeed({"result":{"cmsArticleWebOld":[{"date":"2024-03-29 18:01:02","title":"<em>贵州茅台</em>年报","content":"全文","mediaName":"证券时报","code":"202403293031"}]}})"#,
    )));
    let service = service(
        Arc::new(MemoryCache::new()),
        SourceSet::builder()
            .with_news_source(Arc::new(EastmoneyAdapter::new(http.clone(), 5_000)))
            .build(),
    );

    // When: March news is requested
    let request = NewsRequest::new(
        security("600519", AssetClass::EquityDomestic),
        Some(date!(2024 - 03 - 01)),
        date!(2024 - 03 - 31),
    )
    .expect("request");
    let items = service.get_company_news(&request).await.expect("news");

    // Then: the article carries canonical fields
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].ticker, "600519");
    assert_eq!(items[0].title, "贵州茅台年报");
    assert_eq!(items[0].author, "证券时报");
    assert_eq!(items[0].url, "http://finance.eastmoney.com/a/202403293031.html");
    assert_eq!(http.requests()[0].method, HttpMethod::Get);
}
