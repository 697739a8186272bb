//! Registry of remote collaborators used by the retrieval service.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use crate::adapters::{EastmoneyAdapter, FinancialDatasetsAdapter, SinaAdapter};
use crate::data_source::{FundamentalsSource, InsiderTradeSource, NewsSource, PriceSource};
use crate::http_client::{HttpAuth, HttpClient, ReqwestHttpClient};
use crate::AssetClass;

/// Sources keyed by the asset class they serve.
///
/// Price and news sources are per asset class; fundamentals and insider
/// trades come from a single provider each.
#[derive(Clone, Default)]
pub struct SourceSet {
    prices: HashMap<AssetClass, Arc<dyn PriceSource>>,
    news: HashMap<AssetClass, Arc<dyn NewsSource>>,
    fundamentals: Option<Arc<dyn FundamentalsSource>>,
    insider_trades: Option<Arc<dyn InsiderTradeSource>>,
}

impl SourceSet {
    pub fn builder() -> SourceSetBuilder {
        SourceSetBuilder::new()
    }

    pub fn price_source(&self, asset_class: AssetClass) -> Option<&dyn PriceSource> {
        self.prices.get(&asset_class).map(Arc::as_ref)
    }

    pub fn news_source(&self, asset_class: AssetClass) -> Option<&dyn NewsSource> {
        self.news.get(&asset_class).map(Arc::as_ref)
    }

    pub fn fundamentals(&self) -> Option<&dyn FundamentalsSource> {
        self.fundamentals.as_deref()
    }

    pub fn insider_trades(&self) -> Option<&dyn InsiderTradeSource> {
        self.insider_trades.as_deref()
    }

    /// Asset classes with a registered news source, sorted.
    pub fn news_asset_classes(&self) -> Vec<AssetClass> {
        let mut classes = self.news.keys().copied().collect::<Vec<_>>();
        classes.sort();
        classes
    }
}

impl std::fmt::Debug for SourceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut prices = self.prices.keys().copied().collect::<Vec<_>>();
        prices.sort();
        f.debug_struct("SourceSet")
            .field("prices", &prices)
            .field("news", &self.news_asset_classes())
            .field("fundamentals", &self.fundamentals.is_some())
            .field("insider_trades", &self.insider_trades.is_some())
            .finish()
    }
}

/// Builder for a [`SourceSet`].
///
/// ```rust,ignore
/// use ferrofeed_core::SourceSet;
///
/// // Eastmoney, Sina and financialdatasets.ai over reqwest,
/// // with the API key taken from the environment.
/// let sources = SourceSet::builder().with_default_adapters().build();
/// ```
#[derive(Default)]
pub struct SourceSetBuilder {
    sources: SourceSet,
    http_client: Option<Arc<dyn HttpClient>>,
    financial_datasets_api_key: Option<String>,
    timeout_ms: Option<u64>,
}

impl SourceSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport used by [`SourceSetBuilder::with_default_adapters`]; reqwest when unset.
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_financial_datasets_key(mut self, key: impl Into<String>) -> Self {
        self.financial_datasets_api_key = Some(key.into());
        self
    }

    /// Register a price source under the asset class it reports.
    pub fn with_price_source(mut self, source: Arc<dyn PriceSource>) -> Self {
        self.sources.prices.insert(source.asset_class(), source);
        self
    }

    pub fn with_news_source(mut self, source: Arc<dyn NewsSource>) -> Self {
        self.sources.news.insert(source.asset_class(), source);
        self
    }

    pub fn with_fundamentals_source(mut self, source: Arc<dyn FundamentalsSource>) -> Self {
        self.sources.fundamentals = Some(source);
        self
    }

    pub fn with_insider_trade_source(mut self, source: Arc<dyn InsiderTradeSource>) -> Self {
        self.sources.insider_trades = Some(source);
        self
    }

    /// Register the stock providers for every slot not filled yet.
    ///
    /// Reads the financialdatasets.ai key from `FERROFEED_FINANCIAL_DATASETS_API_KEY`,
    /// falling back to `FINANCIAL_DATASETS_API_KEY`, unless one was set explicitly.
    pub fn with_default_adapters(mut self) -> Self {
        let http_client: Arc<dyn HttpClient> = match &self.http_client {
            Some(http_client) => http_client.clone(),
            None => Arc::new(ReqwestHttpClient::new()),
        };
        let timeout_ms = self.timeout_ms.unwrap_or(10_000);
        let api_key = self.financial_datasets_api_key.clone().or_else(|| {
            env::var("FERROFEED_FINANCIAL_DATASETS_API_KEY")
                .or_else(|_| env::var("FINANCIAL_DATASETS_API_KEY"))
                .ok()
        });

        let eastmoney = Arc::new(EastmoneyAdapter::new(http_client.clone(), timeout_ms));
        let financial_datasets = Arc::new(FinancialDatasetsAdapter::new(
            http_client.clone(),
            HttpAuth::api_key_header("X-API-KEY", api_key),
            timeout_ms,
        ));

        let domestic_prices: Arc<dyn PriceSource> = eastmoney.clone();
        let domestic_news: Arc<dyn NewsSource> = eastmoney;
        let fundamentals: Arc<dyn FundamentalsSource> = financial_datasets.clone();
        let insider_trades: Arc<dyn InsiderTradeSource> = financial_datasets;

        self.sources
            .prices
            .entry(AssetClass::EquityDomestic)
            .or_insert(domestic_prices);
        self.sources
            .news
            .entry(AssetClass::EquityDomestic)
            .or_insert(domestic_news);
        for asset_class in [AssetClass::EquityForeign, AssetClass::Derivative] {
            self.sources.prices.entry(asset_class).or_insert_with(|| {
                let sina: Arc<dyn PriceSource> =
                    Arc::new(SinaAdapter::new(asset_class, http_client.clone(), timeout_ms));
                sina
            });
        }
        self.sources.fundamentals.get_or_insert(fundamentals);
        self.sources.insider_trades.get_or_insert(insider_trades);
        self
    }

    pub fn build(self) -> SourceSet {
        self.sources
    }
}
