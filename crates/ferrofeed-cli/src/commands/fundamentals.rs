use ferrofeed_core::{LineItemRequest, MarketDataService, MetricsRequest, PeriodKind};
use serde::Serialize;

use crate::cli::{LineItemsArgs, MarketCapArgs, MetricsArgs};
use crate::error::CliError;
use crate::output;

use super::{date_or_today, symbol};

#[derive(Debug, Serialize)]
struct MarketCapData {
    symbol: String,
    as_of: String,
    market_cap: Option<f64>,
}

fn period_or(raw: Option<&String>, fallback: PeriodKind) -> Result<PeriodKind, CliError> {
    match raw {
        Some(value) => Ok(value.parse()?),
        None => Ok(fallback),
    }
}

pub async fn run_metrics(
    args: &MetricsArgs,
    service: &MarketDataService,
    pretty: bool,
) -> Result<(), CliError> {
    let config = service.config();
    let request = MetricsRequest::new(
        symbol(&args.symbol)?,
        date_or_today(args.end.as_ref())?,
        period_or(args.period.as_ref(), config.metrics_period)?,
        args.limit.unwrap_or(config.metrics_limit),
    )?
    .with_mode(args.cache_mode.mode());

    let metrics = service.get_financial_metrics(&request).await?;
    output::render_json(&metrics, pretty)
}

pub async fn run_line_items(
    args: &LineItemsArgs,
    service: &MarketDataService,
    pretty: bool,
) -> Result<(), CliError> {
    let config = service.config();
    let request = LineItemRequest::new(
        symbol(&args.symbol)?,
        &args.line_items,
        date_or_today(args.end.as_ref())?,
        period_or(args.period.as_ref(), config.metrics_period)?,
        args.limit.unwrap_or(config.metrics_limit),
    )?
    .with_mode(args.cache_mode.mode());

    let items = service.search_line_items(&request).await?;
    output::render_json(&items, pretty)
}

pub async fn run_market_cap(
    args: &MarketCapArgs,
    service: &MarketDataService,
    pretty: bool,
) -> Result<(), CliError> {
    let symbol = symbol(&args.symbol)?;
    let as_of = date_or_today(args.as_of.as_ref())?;
    let market_cap = service.get_market_cap(&symbol, as_of).await?;

    output::render_json(
        &MarketCapData {
            symbol: symbol.to_string(),
            as_of: ferrofeed_core::format_date(as_of),
            market_cap,
        },
        pretty,
    )
}
