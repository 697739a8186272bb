mod cache;
mod fundamentals;
mod insider_trades;
mod news;
mod prices;

use std::sync::Arc;

use ferrofeed_core::{
    parse_date, AssetClass, CacheGateway, MarketDataService, MemoryCache, RetrievalFeatures,
    SecurityId, ServiceConfig, SourceSet, Symbol,
};
use ferrofeed_warehouse::{Warehouse, WarehouseCache, WarehouseConfig};
use time::{Date, OffsetDateTime};
use tracing::debug;

use crate::cli::{CacheBackend, Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    if let Command::Cache(args) = &cli.command {
        return cache::run(args, &open_warehouse(cli)?, cli.pretty);
    }

    let service = build_service(cli)?;
    match &cli.command {
        Command::Prices(args) => prices::run(args, &service, cli.pretty).await,
        Command::Metrics(args) => fundamentals::run_metrics(args, &service, cli.pretty).await,
        Command::LineItems(args) => fundamentals::run_line_items(args, &service, cli.pretty).await,
        Command::MarketCap(args) => fundamentals::run_market_cap(args, &service, cli.pretty).await,
        Command::InsiderTrades(args) => insider_trades::run(args, &service, cli.pretty).await,
        Command::News(args) => news::run(args, &service, cli.pretty).await,
        Command::Cache(_) => Ok(()),
    }
}

fn build_service(cli: &Cli) -> Result<MarketDataService, CliError> {
    let mut config = ServiceConfig::from_env()?;
    if cli.all_features {
        config = config.with_features(RetrievalFeatures::all());
    }

    let cache: Arc<dyn CacheGateway> = match cli.cache {
        CacheBackend::Memory => Arc::new(MemoryCache::new()),
        CacheBackend::Warehouse => Arc::new(WarehouseCache::new(open_warehouse(cli)?)),
    };
    debug!(backend = ?cli.cache, features = ?config.features, "service configured");

    let sources = SourceSet::builder()
        .with_timeout_ms(config.http_timeout_ms)
        .with_default_adapters()
        .build();
    Ok(MarketDataService::new(cache, sources, config))
}

fn open_warehouse(cli: &Cli) -> Result<Warehouse, CliError> {
    let mut config = WarehouseConfig::default();
    if let Some(path) = &cli.db_path {
        config = config.with_db_path(path);
    }
    Ok(Warehouse::open(config)?)
}

fn security(symbol: &str, asset: &str) -> Result<SecurityId, CliError> {
    let asset_class = asset.parse::<AssetClass>()?;
    Ok(SecurityId::parse(symbol, asset_class)?)
}

fn symbol(raw: &str) -> Result<Symbol, CliError> {
    Ok(Symbol::parse(raw)?)
}

fn optional_date(raw: Option<&String>) -> Result<Option<Date>, CliError> {
    raw.map(|value| parse_date(value)).transpose().map_err(CliError::from)
}

/// Parsed date, or today's UTC date when none was given.
fn date_or_today(raw: Option<&String>) -> Result<Date, CliError> {
    Ok(optional_date(raw)?.unwrap_or_else(|| OffsetDateTime::now_utc().date()))
}
