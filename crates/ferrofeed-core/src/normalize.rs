//! Record normalizer: provider rows to canonical records.
//!
//! Each asset class has its own column vocabulary. Domestic equity rows
//! arrive with the exchange's Chinese labels (`日期`, `开盘`, ...), the
//! foreign and derivative feeds use one-letter keys (`d`, `o`, `h`, ...).
//! Rows that cannot be mapped or that break a record invariant are logged
//! and dropped; the rest are returned in chronological order.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::cache::{EntityKind, RawRecord};
use crate::data_source::RawRow;
use crate::{
    AssetClass, CacheError, CompanyNewsItem, Granularity, MarketTime, NormalizeError, PricePoint,
};

struct PriceColumns {
    time: &'static [&'static str],
    open: &'static [&'static str],
    high: &'static [&'static str],
    low: &'static [&'static str],
    close: &'static [&'static str],
    volume: &'static [&'static str],
}

const DOMESTIC_COLUMNS: PriceColumns = PriceColumns {
    time: &["日期", "trade_date", "time"],
    open: &["开盘", "open"],
    high: &["最高", "high"],
    low: &["最低", "low"],
    close: &["收盘", "close"],
    volume: &["成交量", "vol", "volume"],
};

const FOREIGN_COLUMNS: PriceColumns = PriceColumns {
    time: &["d", "date", "trade_date", "time"],
    open: &["o", "open"],
    high: &["h", "high"],
    low: &["l", "low"],
    close: &["c", "close"],
    volume: &["v", "volume", "vol"],
};

const DERIVATIVE_COLUMNS: PriceColumns = PriceColumns {
    time: &["d", "datetime", "trade_date", "time"],
    open: &["o", "open"],
    high: &["h", "high"],
    low: &["l", "low"],
    close: &["c", "close"],
    volume: &["v", "volume", "vol"],
};

const fn price_columns(asset_class: AssetClass) -> &'static PriceColumns {
    match asset_class {
        AssetClass::EquityDomestic => &DOMESTIC_COLUMNS,
        AssetClass::EquityForeign => &FOREIGN_COLUMNS,
        AssetClass::Derivative => &DERIVATIVE_COLUMNS,
    }
}

/// Provider news label to canonical field.
const NEWS_RENAMES: [(&str, &str); 6] = [
    ("关键词", "ticker"),
    ("新闻标题", "title"),
    ("文章来源", "author"),
    ("新闻内容", "source"),
    ("发布时间", "date"),
    ("新闻链接", "url"),
];

/// Map provider price rows onto [`PricePoint`]s, ascending by time.
///
/// Duplicate timestamps keep the last row seen.
pub fn normalize_prices(asset_class: AssetClass, rows: &[RawRow]) -> Vec<PricePoint> {
    let columns = price_columns(asset_class);
    let granularity = asset_class.granularity();
    let mut points = BTreeMap::new();

    for (index, row) in rows.iter().enumerate() {
        match price_point(index, row, columns, granularity) {
            Ok(point) => {
                points.insert(point.time, point);
            }
            Err(error) => warn!(%asset_class, %error, "skipping price row"),
        }
    }

    points.into_values().collect()
}

fn price_point(
    row_index: usize,
    row: &RawRow,
    columns: &PriceColumns,
    granularity: Granularity,
) -> Result<PricePoint, NormalizeError> {
    let (column, raw_time) = lookup(row_index, row, columns.time, "time")?;
    let time_text = match raw_time {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        other => return Err(invalid_value(row_index, column, other)),
    };
    let time = MarketTime::parse_with(&time_text, granularity)
        .map_err(|source| NormalizeError::Invalid { row: row_index, source })?;

    let open = coerce_f64(row_index, row, columns.open, "open")?;
    let high = coerce_f64(row_index, row, columns.high, "high")?;
    let low = coerce_f64(row_index, row, columns.low, "low")?;
    let close = coerce_f64(row_index, row, columns.close, "close")?;
    let volume = coerce_u64(row_index, row, columns.volume, "volume")?;

    PricePoint::new(time, open, high, low, close, volume)
        .map_err(|source| NormalizeError::Invalid { row: row_index, source })
}

/// Map provider news rows onto [`CompanyNewsItem`]s.
///
/// Provider labels are renamed to canonical fields; rows already in the
/// canonical shape pass through unchanged.
pub fn normalize_news(rows: &[RawRow]) -> Vec<CompanyNewsItem> {
    let mut items = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        let mut renamed = RawRow::new();
        for (key, value) in row {
            let canonical = NEWS_RENAMES
                .iter()
                .find(|(label, _)| label == key)
                .map_or(key.as_str(), |(_, field)| field);
            renamed.insert(canonical.to_owned(), value.clone());
        }

        match news_item(index, renamed) {
            Ok(item) => items.push(item),
            Err(error) => warn!(%error, "skipping news row"),
        }
    }

    items
}

fn news_item(row_index: usize, row: RawRow) -> Result<CompanyNewsItem, NormalizeError> {
    let (_, raw_date) = lookup(row_index, &row, &["date"], "date")?;
    let date_text = raw_date
        .as_str()
        .ok_or_else(|| invalid_value(row_index, "date", raw_date))?;
    let date = MarketTime::parse_with(date_text, Granularity::Intraday)
        .map_err(|source| NormalizeError::Invalid { row: row_index, source })?;

    let mut row = row;
    row.insert(String::from("date"), Value::String(date.to_compact()));
    serde_json::from_value(Value::Object(row)).map_err(|error| NormalizeError::Decode {
        row: row_index,
        message: error.to_string(),
    })
}

/// Decode rows already in canonical shape (metrics, line items, insider
/// trades), dropping the ones that do not fit.
pub fn normalize_records<T: DeserializeOwned>(kind: EntityKind, rows: Vec<RawRow>) -> Vec<T> {
    rows.into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value(Value::Object(row)) {
            Ok(record) => Some(record),
            Err(error) => {
                warn!(%kind, row = index, %error, "skipping provider record");
                None
            }
        })
        .collect()
}

/// Decode cached raw records. Unlike provider rows, any bad record fails the whole set.
pub fn decode_cached<T: DeserializeOwned>(records: Vec<RawRecord>) -> Result<Vec<T>, NormalizeError> {
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            serde_json::from_value(Value::Object(record)).map_err(|error| NormalizeError::Decode {
                row: index,
                message: error.to_string(),
            })
        })
        .collect()
}

/// Encode canonical records into the raw shape stored by the cache.
pub fn encode_records<T: Serialize>(records: &[T]) -> Result<Vec<RawRecord>, CacheError> {
    records
        .iter()
        .map(|record| match serde_json::to_value(record)? {
            Value::Object(map) => Ok(map),
            other => Err(CacheError::Backend(format!(
                "record encoded as {other} instead of an object"
            ))),
        })
        .collect()
}

fn lookup<'r>(
    row_index: usize,
    row: &'r RawRow,
    aliases: &[&'static str],
    column: &'static str,
) -> Result<(&'static str, &'r Value), NormalizeError> {
    aliases
        .iter()
        .find_map(|alias| {
            row.get(*alias)
                .filter(|value| !value.is_null())
                .map(|value| (*alias, value))
        })
        .ok_or(NormalizeError::MissingColumn {
            row: row_index,
            column,
        })
}

fn coerce_f64(
    row_index: usize,
    row: &RawRow,
    aliases: &[&'static str],
    column: &'static str,
) -> Result<f64, NormalizeError> {
    let (found, value) = lookup(row_index, row, aliases, column)?;
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| invalid_value(row_index, found, value))
}

fn coerce_u64(
    row_index: usize,
    row: &RawRow,
    aliases: &[&'static str],
    column: &'static str,
) -> Result<u64, NormalizeError> {
    let (found, value) = lookup(row_index, row, aliases, column)?;
    if let Some(volume) = value.as_u64() {
        return Ok(volume);
    }

    let as_float = coerce_f64(row_index, row, &[found], column)?;
    if as_float.is_finite() && as_float >= 0.0 {
        Ok(as_float.round() as u64)
    } else {
        Err(invalid_value(row_index, found, value))
    }
}

fn invalid_value(row: usize, column: &'static str, value: &Value) -> NormalizeError {
    NormalizeError::InvalidValue {
        row,
        column,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::InsiderTrade;

    fn row(value: Value) -> RawRow {
        value.as_object().cloned().expect("object row")
    }

    #[test]
    fn maps_domestic_labels_and_sorts_ascending() {
        let rows = vec![
            row(json!({"日期": "2024-01-03", "开盘": 10.1, "收盘": 10.3, "最高": 10.5, "最低": 10.0, "成交量": 1200})),
            row(json!({"日期": "2024-01-02", "开盘": "9.8", "收盘": "10.1", "最高": "10.2", "最低": "9.7", "成交量": "1,000"})),
        ];

        let points = normalize_prices(AssetClass::EquityDomestic, &rows);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].time.to_compact(), "20240102");
        assert_eq!(points[0].volume, 1_000);
        assert_eq!(points[1].close, 10.3);
    }

    #[test]
    fn derivative_rows_keep_time_of_day() {
        let rows = vec![row(json!({
            "d": "2024-01-05 09:15:00", "o": "3800", "h": "3810", "l": "3795", "c": "3805", "v": "5120"
        }))];

        let points = normalize_prices(AssetClass::Derivative, &rows);
        assert_eq!(points[0].time.to_compact(), "20240105091500");
    }

    #[test]
    fn drops_rows_that_break_price_invariant() {
        let rows = vec![
            row(json!({"d": "2024-01-02", "o": 10.0, "h": 9.0, "l": 11.0, "c": 10.0, "v": 1})),
            row(json!({"d": "2024-01-03", "o": 10.0, "h": 11.0, "l": 9.0, "c": 10.0})),
            row(json!({"d": "2024-01-04", "o": 10.0, "h": 11.0, "l": 9.0, "c": 10.5, "v": 7})),
        ];

        let points = normalize_prices(AssetClass::EquityForeign, &rows);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].time.to_compact(), "20240104");
    }

    #[test]
    fn renames_news_labels_and_compacts_dates() {
        let rows = vec![row(json!({
            "关键词": "600519",
            "新闻标题": "贵州茅台发布年报",
            "文章来源": "证券时报",
            "新闻内容": "全文",
            "发布时间": "2024-03-29 18:01:02",
            "新闻链接": "http://finance.eastmoney.com/a/1.html"
        }))];

        let items = normalize_news(&rows);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].ticker, "600519");
        assert_eq!(items[0].author, "证券时报");
        assert_eq!(items[0].date.to_compact(), "20240329180102");
    }

    #[test]
    fn cached_records_fail_as_a_set() {
        let records = vec![
            row(json!({"ticker": "AAPL", "filing_date": "2024-01-02"})),
            row(json!({"ticker": "AAPL"})),
        ];

        let err = decode_cached::<InsiderTrade>(records).expect_err("second record is malformed");
        assert!(matches!(err, NormalizeError::Decode { row: 1, .. }));
    }

    #[test]
    fn provider_records_skip_bad_rows() {
        let rows = vec![
            row(json!({"ticker": "AAPL", "filing_date": "2024-01-02"})),
            row(json!({"ticker": "AAPL", "filing_date": "not a date"})),
        ];

        let trades: Vec<InsiderTrade> = normalize_records(EntityKind::InsiderTrades, rows);
        assert_eq!(trades.len(), 1);
    }

    #[test]
    fn encoded_records_decode_back() {
        let points = normalize_prices(
            AssetClass::EquityForeign,
            &[row(json!({"d": "2024-01-04", "o": 10.0, "h": 11.0, "l": 9.0, "c": 10.5, "v": 7}))],
        );
        let raw = encode_records(&points).expect("encode");
        assert_eq!(raw[0].get("time"), Some(&json!("20240104")));

        let decoded: Vec<PricePoint> = decode_cached(raw).expect("decode");
        assert_eq!(decoded, points);
    }
}
