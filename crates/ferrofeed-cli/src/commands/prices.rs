use ferrofeed_core::{parse_date, MarketDataService, PriceRequest};

use crate::cli::{OutputFormat, PricesArgs};
use crate::error::CliError;
use crate::output;

use super::{date_or_today, security};

pub async fn run(
    args: &PricesArgs,
    service: &MarketDataService,
    pretty: bool,
) -> Result<(), CliError> {
    let security = security(&args.symbol, &args.asset)?;
    let start = parse_date(&args.start)?;
    let end = date_or_today(args.end.as_ref())?;
    let request = PriceRequest::new(security, start, end)?.with_mode(args.cache_mode.mode());

    match args.format {
        OutputFormat::Json => {
            let points = service.get_prices(&request).await?;
            output::render_json(&points, pretty)
        }
        OutputFormat::Table => {
            let frame = service.get_price_frame(&request).await?;
            output::render_price_table(&frame)
        }
    }
}
