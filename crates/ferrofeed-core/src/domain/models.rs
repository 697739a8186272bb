use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::Date;

use crate::domain::timestamp::{iso_date, option_iso_date};
use crate::domain::MarketTime;
use crate::ValidationError;

/// One OHLCV observation of a price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PricePointFields")]
pub struct PricePoint {
    pub time: MarketTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PricePoint {
    pub fn new(
        time: MarketTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("open", open)?;
        validate_non_negative("high", high)?;
        validate_non_negative("low", low)?;
        validate_non_negative("close", close)?;

        if high < low {
            return Err(ValidationError::InvalidPriceRange);
        }

        if open < low || open > high || close < low || close > high {
            return Err(ValidationError::InvalidPriceBounds);
        }

        Ok(Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

#[derive(Deserialize)]
struct PricePointFields {
    time: MarketTime,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

impl TryFrom<PricePointFields> for PricePoint {
    type Error = ValidationError;

    fn try_from(value: PricePointFields) -> Result<Self, Self::Error> {
        Self::new(
            value.time,
            value.open,
            value.high,
            value.low,
            value.close,
            value.volume,
        )
    }
}

/// Reporting period of a fundamentals record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Ttm,
    Annual,
    Quarterly,
}

impl PeriodKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ttm => "ttm",
            Self::Annual => "annual",
            Self::Quarterly => "quarterly",
        }
    }
}

impl Display for PeriodKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ttm" => Ok(Self::Ttm),
            "annual" => Ok(Self::Annual),
            "quarterly" => Ok(Self::Quarterly),
            other => Err(ValidationError::InvalidPeriod {
                value: other.to_owned(),
            }),
        }
    }
}

/// Valuation, profitability, liquidity and growth ratios for one report period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetric {
    pub ticker: String,
    #[serde(with = "iso_date")]
    pub report_period: Date,
    pub period: PeriodKind,
    #[serde(default)]
    pub currency: Option<String>,

    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub enterprise_value: Option<f64>,
    #[serde(default)]
    pub price_to_earnings_ratio: Option<f64>,
    #[serde(default)]
    pub price_to_book_ratio: Option<f64>,
    #[serde(default)]
    pub price_to_sales_ratio: Option<f64>,
    #[serde(default)]
    pub enterprise_value_to_ebitda_ratio: Option<f64>,
    #[serde(default)]
    pub enterprise_value_to_revenue_ratio: Option<f64>,
    #[serde(default)]
    pub free_cash_flow_yield: Option<f64>,
    #[serde(default)]
    pub peg_ratio: Option<f64>,

    #[serde(default)]
    pub gross_margin: Option<f64>,
    #[serde(default)]
    pub operating_margin: Option<f64>,
    #[serde(default)]
    pub net_margin: Option<f64>,
    #[serde(default)]
    pub return_on_equity: Option<f64>,
    #[serde(default)]
    pub return_on_assets: Option<f64>,
    #[serde(default)]
    pub return_on_invested_capital: Option<f64>,

    #[serde(default)]
    pub asset_turnover: Option<f64>,
    #[serde(default)]
    pub inventory_turnover: Option<f64>,
    #[serde(default)]
    pub receivables_turnover: Option<f64>,
    #[serde(default)]
    pub days_sales_outstanding: Option<f64>,
    #[serde(default)]
    pub operating_cycle: Option<f64>,
    #[serde(default)]
    pub working_capital_turnover: Option<f64>,

    #[serde(default)]
    pub current_ratio: Option<f64>,
    #[serde(default)]
    pub quick_ratio: Option<f64>,
    #[serde(default)]
    pub cash_ratio: Option<f64>,
    #[serde(default)]
    pub operating_cash_flow_ratio: Option<f64>,
    #[serde(default)]
    pub debt_to_equity: Option<f64>,
    #[serde(default)]
    pub debt_to_assets: Option<f64>,
    #[serde(default)]
    pub interest_coverage: Option<f64>,

    #[serde(default)]
    pub revenue_growth: Option<f64>,
    #[serde(default)]
    pub earnings_growth: Option<f64>,
    #[serde(default)]
    pub book_value_growth: Option<f64>,
    #[serde(default)]
    pub earnings_per_share_growth: Option<f64>,
    #[serde(default)]
    pub free_cash_flow_growth: Option<f64>,
    #[serde(default)]
    pub operating_income_growth: Option<f64>,
    #[serde(default)]
    pub ebitda_growth: Option<f64>,

    #[serde(default)]
    pub payout_ratio: Option<f64>,
    #[serde(default)]
    pub earnings_per_share: Option<f64>,
    #[serde(default)]
    pub book_value_per_share: Option<f64>,
    #[serde(default)]
    pub free_cash_flow_per_share: Option<f64>,
}

impl FinancialMetric {
    /// Merge key: one record per report period and period kind.
    pub fn key(&self) -> (Date, PeriodKind) {
        (self.report_period, self.period)
    }
}

/// Open-ended set of named statement line items for one report period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub ticker: String,
    #[serde(with = "iso_date")]
    pub report_period: Date,
    pub period: PeriodKind,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(flatten)]
    pub values: BTreeMap<String, Value>,
}

impl LineItem {
    pub fn key(&self) -> (Date, PeriodKind) {
        (self.report_period, self.period)
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(Value::as_f64)
    }

    pub fn has_all<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names
            .iter()
            .all(|name| self.values.contains_key(name.as_ref()))
    }
}

/// A reported insider transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsiderTrade {
    pub ticker: String,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub is_board_director: Option<bool>,
    #[serde(default, with = "option_iso_date")]
    pub transaction_date: Option<Date>,
    #[serde(default)]
    pub transaction_shares: Option<f64>,
    #[serde(default)]
    pub transaction_price_per_share: Option<f64>,
    #[serde(default)]
    pub transaction_value: Option<f64>,
    #[serde(default)]
    pub shares_owned_before_transaction: Option<f64>,
    #[serde(default)]
    pub shares_owned_after_transaction: Option<f64>,
    #[serde(default)]
    pub security_title: Option<String>,
    #[serde(with = "iso_date")]
    pub filing_date: Date,
}

impl InsiderTrade {
    /// Ordering date: the transaction date when reported, else the filing date.
    pub fn effective_date(&self) -> Date {
        self.transaction_date.unwrap_or(self.filing_date)
    }

    /// Value identity used to drop duplicates across overlapping pages.
    pub fn identity(&self) -> TradeIdentity {
        TradeIdentity {
            filing_date: self.filing_date,
            transaction_date: self.transaction_date,
            name: self.name.clone(),
            security_title: self.security_title.clone(),
            shares: self.transaction_shares.map(f64::to_bits),
            price: self.transaction_price_per_share.map(f64::to_bits),
            value: self.transaction_value.map(f64::to_bits),
            owned_after: self.shares_owned_after_transaction.map(f64::to_bits),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TradeIdentity {
    filing_date: Date,
    transaction_date: Option<Date>,
    name: Option<String>,
    security_title: Option<String>,
    shares: Option<u64>,
    price: Option<u64>,
    value: Option<u64>,
    owned_after: Option<u64>,
}

/// A news article mentioning a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyNewsItem {
    pub ticker: String,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub source: String,
    pub date: MarketTime,
    pub url: String,
    #[serde(default)]
    pub sentiment: Option<String>,
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}
