//! Service configuration.
//!
//! Defaults reproduce the historical behaviour of the retrieval layer: the
//! fundamentals and insider endpoints are switched off, domestic equity
//! history is anchored at 2015-04-01, and metrics default to trailing twelve
//! months. Every value can be overridden from `FERROFEED_*` environment
//! variables.

use std::env;

use time::macros::date;
use time::Date;

use crate::domain::parse_date;
use crate::{PeriodKind, ValidationError};

/// Switches for the retrieval paths that are disabled unless asked for.
///
/// A disabled path returns an empty result without touching the cache or
/// any remote source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetrievalFeatures {
    pub financial_metrics: bool,
    pub line_items: bool,
    pub insider_trades: bool,
}

impl RetrievalFeatures {
    pub const fn all() -> Self {
        Self {
            financial_metrics: true,
            line_items: true,
            insider_trades: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub features: RetrievalFeatures,
    /// First day fetched for domestic equities, regardless of the requested start.
    pub domestic_history_start: Date,
    pub metrics_period: PeriodKind,
    pub metrics_limit: usize,
    pub insider_page_limit: usize,
    pub news_limit: usize,
    pub http_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            features: RetrievalFeatures::default(),
            domestic_history_start: date!(2015 - 04 - 01),
            metrics_period: PeriodKind::Ttm,
            metrics_limit: 10,
            insider_page_limit: 1_000,
            news_limit: 1_000,
            http_timeout_ms: 10_000,
        }
    }
}

impl ServiceConfig {
    /// Defaults overridden by `FERROFEED_*` environment variables.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`ServiceConfig::from_env`] with an explicit variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("FERROFEED_ENABLE_FINANCIAL_METRICS") {
            config.features.financial_metrics =
                parse_flag("FERROFEED_ENABLE_FINANCIAL_METRICS", &value)?;
        }
        if let Some(value) = lookup("FERROFEED_ENABLE_LINE_ITEMS") {
            config.features.line_items = parse_flag("FERROFEED_ENABLE_LINE_ITEMS", &value)?;
        }
        if let Some(value) = lookup("FERROFEED_ENABLE_INSIDER_TRADES") {
            config.features.insider_trades =
                parse_flag("FERROFEED_ENABLE_INSIDER_TRADES", &value)?;
        }
        if let Some(value) = lookup("FERROFEED_DOMESTIC_HISTORY_START") {
            config.domestic_history_start = parse_date(&value)?;
        }
        if let Some(value) = lookup("FERROFEED_METRICS_PERIOD") {
            config.metrics_period = value.parse()?;
        }
        if let Some(value) = lookup("FERROFEED_METRICS_LIMIT") {
            config.metrics_limit = parse_limit("FERROFEED_METRICS_LIMIT", &value)?;
        }
        if let Some(value) = lookup("FERROFEED_INSIDER_PAGE_LIMIT") {
            config.insider_page_limit = parse_limit("FERROFEED_INSIDER_PAGE_LIMIT", &value)?;
        }
        if let Some(value) = lookup("FERROFEED_NEWS_LIMIT") {
            config.news_limit = parse_limit("FERROFEED_NEWS_LIMIT", &value)?;
        }
        if let Some(value) = lookup("FERROFEED_HTTP_TIMEOUT_MS") {
            config.http_timeout_ms = value
                .trim()
                .parse()
                .map_err(|_| invalid("FERROFEED_HTTP_TIMEOUT_MS", &value))?;
        }

        Ok(config)
    }

    pub fn with_features(mut self, features: RetrievalFeatures) -> Self {
        self.features = features;
        self
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ValidationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid(name, value)),
    }
}

fn parse_limit(name: &'static str, value: &str) -> Result<usize, ValidationError> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err(ValidationError::ZeroLimit),
        Ok(limit) => Ok(limit),
        Err(_) => Err(invalid(name, value)),
    }
}

fn invalid(name: &'static str, value: &str) -> ValidationError {
    ValidationError::InvalidSetting {
        name,
        value: value.to_owned(),
    }
}
