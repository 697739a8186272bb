use ferrofeed_core::{InsiderTradeRequest, MarketDataService};

use crate::cli::InsiderTradesArgs;
use crate::error::CliError;
use crate::output;

use super::{date_or_today, optional_date, symbol};

pub async fn run(
    args: &InsiderTradesArgs,
    service: &MarketDataService,
    pretty: bool,
) -> Result<(), CliError> {
    let mut request = InsiderTradeRequest::new(
        symbol(&args.symbol)?,
        optional_date(args.start.as_ref())?,
        date_or_today(args.end.as_ref())?,
    )?
    .with_mode(args.cache_mode.mode());
    if let Some(page_limit) = args.page_limit {
        request = request.with_page_limit(page_limit)?;
    }

    let trades = service.get_insider_trades(&request).await?;
    output::render_json(&trades, pretty)
}
