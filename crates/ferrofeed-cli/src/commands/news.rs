use ferrofeed_core::{MarketDataService, NewsRequest};

use crate::cli::NewsArgs;
use crate::error::CliError;
use crate::output;

use super::{date_or_today, optional_date, security};

pub async fn run(args: &NewsArgs, service: &MarketDataService, pretty: bool) -> Result<(), CliError> {
    let mut request = NewsRequest::new(
        security(&args.symbol, &args.asset)?,
        optional_date(args.start.as_ref())?,
        date_or_today(args.end.as_ref())?,
    )?
    .with_mode(args.cache_mode.mode());
    if let Some(limit) = args.limit {
        request = request.with_limit(limit)?;
    }

    let news = service.get_company_news(&request).await?;
    output::render_json(&news, pretty)
}
