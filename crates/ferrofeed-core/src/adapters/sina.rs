use std::sync::Arc;

use serde_json::Value;

use super::{fetch_body, strip_jsonp};
use crate::data_source::{PriceQuery, PriceSource, RawRow, SourceError, SourceFuture};
use crate::domain::parse_date;
use crate::http_client::{HttpClient, HttpRequest};
use crate::AssetClass;

const PROVIDER: &str = "sina";
const US_DAILY_URL: &str = "https://stock.finance.sina.com.cn/usstock/api/jsonp_v2.php";
const FUTURES_MINUTE_URL: &str = "https://stock2.finance.sina.com.cn/futures/api/jsonp.php";
const FUTURES_PERIOD_MINUTES: &str = "15";

/// Sina JSONP feeds: foreign equity daily bars or derivative 15-minute bars.
///
/// Rows keep Sina's one-letter keys (`d`, `o`, `h`, `l`, `c`, `v`).
#[derive(Clone)]
pub struct SinaAdapter {
    asset_class: AssetClass,
    http_client: Arc<dyn HttpClient>,
    timeout_ms: u64,
}

impl SinaAdapter {
    pub fn new(asset_class: AssetClass, http_client: Arc<dyn HttpClient>, timeout_ms: u64) -> Self {
        Self {
            asset_class,
            http_client,
            timeout_ms,
        }
    }

    fn request(&self, query: &PriceQuery) -> Result<HttpRequest, SourceError> {
        let symbol = query.symbol.as_str();
        let request = match self.asset_class {
            AssetClass::EquityForeign => HttpRequest::get(format!(
                "{US_DAILY_URL}/var%20_{symbol}=/US_MinKService.getDailyK"
            ))
            .with_query("symbol", symbol)
            .with_query("___qn", "3"),
            AssetClass::Derivative => HttpRequest::get(format!(
                "{FUTURES_MINUTE_URL}/var%20_{symbol}=/InnerFuturesNewService.getFewMinLine"
            ))
            .with_query("symbol", symbol)
            .with_query("type", FUTURES_PERIOD_MINUTES),
            AssetClass::EquityDomestic => {
                return Err(SourceError::invalid_request(
                    "sina adapter does not serve domestic equities",
                ))
            }
        };
        Ok(request.with_timeout_ms(self.timeout_ms))
    }

    async fn fetch_bars(&self, query: &PriceQuery) -> Result<Vec<RawRow>, SourceError> {
        let body = fetch_body(self.http_client.as_ref(), PROVIDER, self.request(query)?).await?;
        let rows = parse_bars(&body)?;
        Ok(rows
            .into_iter()
            .filter(|row| within_query(row, query))
            .collect())
    }
}

impl PriceSource for SinaAdapter {
    fn asset_class(&self) -> AssetClass {
        self.asset_class
    }

    fn fetch_prices<'a>(&'a self, query: &'a PriceQuery) -> SourceFuture<'a, Vec<RawRow>> {
        Box::pin(self.fetch_bars(query))
    }
}

fn parse_bars(body: &str) -> Result<Vec<RawRow>, SourceError> {
    let Some(payload) = strip_jsonp(body) else {
        return Ok(Vec::new());
    };
    if payload.is_empty() || payload == "null" {
        return Ok(Vec::new());
    }

    serde_json::from_str(payload)
        .map_err(|e| SourceError::decode(format!("failed to parse sina bars: {e}")))
}

/// Feeds return their whole history; keep rows dated inside the query.
///
/// Rows without a readable date are kept for the normalizer to reject.
fn within_query(row: &RawRow, query: &PriceQuery) -> bool {
    let Some(date) = row
        .get("d")
        .and_then(Value::as_str)
        .and_then(|value| parse_date(value).ok())
    else {
        return true;
    };

    date <= query.end && query.start.map_or(true, |start| date >= start)
}
