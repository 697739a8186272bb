use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{Granularity, Symbol};
use crate::ValidationError;

/// Asset class of a security; selects the remote schema and timestamp granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    /// Shares listed on the home exchanges.
    EquityDomestic,
    /// Shares listed abroad.
    EquityForeign,
    /// Futures contracts, quoted intraday.
    Derivative,
}

impl AssetClass {
    pub const ALL: [Self; 3] = [Self::EquityDomestic, Self::EquityForeign, Self::Derivative];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EquityDomestic => "equity_domestic",
            Self::EquityForeign => "equity_foreign",
            Self::Derivative => "derivative",
        }
    }

    pub const fn granularity(self) -> Granularity {
        match self {
            Self::EquityDomestic | Self::EquityForeign => Granularity::Day,
            Self::Derivative => Granularity::Intraday,
        }
    }
}

impl Display for AssetClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "a" | "domestic" | "equity_domestic" => Ok(Self::EquityDomestic),
            "us" | "foreign" | "equity_foreign" => Ok(Self::EquityForeign),
            "futures" | "derivative" => Ok(Self::Derivative),
            other => Err(ValidationError::InvalidAssetClass {
                value: other.to_owned(),
            }),
        }
    }
}

/// A symbol together with the asset class that decides how it is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecurityId {
    pub symbol: Symbol,
    pub asset_class: AssetClass,
}

impl SecurityId {
    pub fn new(symbol: Symbol, asset_class: AssetClass) -> Self {
        Self {
            symbol,
            asset_class,
        }
    }

    pub fn parse(symbol: &str, asset_class: AssetClass) -> Result<Self, ValidationError> {
        Ok(Self::new(Symbol::parse(symbol)?, asset_class))
    }
}

impl Display for SecurityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.asset_class, self.symbol)
    }
}
