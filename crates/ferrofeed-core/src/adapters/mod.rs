//! Provider adapters.
//!
//! | Adapter | Serves |
//! |---------|--------|
//! | [`EastmoneyAdapter`] | domestic equity daily klines, domestic company news |
//! | [`SinaAdapter`] | foreign equity daily bars, derivative 15-minute bars |
//! | [`FinancialDatasetsAdapter`] | financial metrics, line items, insider trades |
//!
//! Adapters only shape requests and unwrap response envelopes; the rows
//! they return keep the provider's own column names.

mod eastmoney;
mod financial_datasets;
mod sina;

pub use eastmoney::EastmoneyAdapter;
pub use financial_datasets::FinancialDatasetsAdapter;
pub use sina::SinaAdapter;

use crate::data_source::SourceError;
use crate::http_client::{HttpClient, HttpRequest};

/// Execute `request` and return the body of a successful response.
async fn fetch_body(
    http_client: &dyn HttpClient,
    provider: &str,
    request: HttpRequest,
) -> Result<String, SourceError> {
    let response = http_client
        .execute(request)
        .await
        .map_err(|error| SourceError::transport(provider, &error))?;

    if !response.is_success() {
        return Err(SourceError::from_status(
            provider,
            response.status,
            &response.body,
        ));
    }

    Ok(response.body)
}

/// Payload of a JSONP response such as `var _AAPL=([...]);` or `cb({...})`.
fn strip_jsonp(body: &str) -> Option<&str> {
    let open = body
        .find("=(")
        .map(|index| index + 2)
        .or_else(|| body.find('(').map(|index| index + 1))?;
    let close = body.rfind(')')?;
    (close >= open).then(|| body[open..close].trim())
}
