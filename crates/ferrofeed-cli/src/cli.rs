//! CLI argument definitions for ferrofeed.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `prices` | Daily or intraday OHLCV bars |
//! | `metrics` | Financial metric snapshots |
//! | `line-items` | Named financial statement line items |
//! | `insider-trades` | Insider trades filed in a window |
//! | `news` | Company news in a window |
//! | `market-cap` | Market capitalization as of a date |
//! | `cache` | Inspect or clear the persistent cache |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--cache` | `warehouse` | Cache backend (memory, warehouse) |
//! | `--db-path` | `$FERROFEED_HOME/cache/ferrofeed.duckdb` | Warehouse file |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--all-features` | `false` | Enable metrics, line items and insider trades |
//!
//! # Examples
//!
//! ```bash
//! ferrofeed prices 600519 --start 2024-01-02 --end 2024-01-31
//! ferrofeed prices AAPL --asset us --start 2024-01-02 --format table
//! ferrofeed --all-features insider-trades AAPL --start 2023-01-01 --end 2024-06-30
//! ferrofeed cache list
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use ferrofeed_core::CacheMode;

/// Cache-aware market data retrieval.
#[derive(Debug, Parser)]
#[command(
    name = "ferrofeed",
    author,
    version,
    about = "Cache-aware market data retrieval",
    long_about = "ferrofeed fetches prices, financial metrics, line items, insider trades and \
company news, answering from a local cache whenever the cache already covers a request.\n\
\n\
Set RUST_LOG (for example RUST_LOG=ferrofeed_core=debug) to see cache decisions on stderr."
)]
pub struct Cli {
    /// Cache backend used for this invocation.
    #[arg(long, global = true, value_enum, default_value_t = CacheBackend::Warehouse)]
    pub cache: CacheBackend,

    /// DuckDB file for the warehouse backend.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Enable financial metrics, line items and insider trades regardless of
    /// the FERROFEED_ENABLE_* variables.
    #[arg(long, global = true, default_value_t = false)]
    pub all_features: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Cache backend options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackend {
    /// Process-local cache, discarded on exit.
    Memory,
    /// DuckDB file shared across invocations.
    Warehouse,
}

/// Output format for price bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON array of records.
    Json,
    /// Aligned text columns.
    Table,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch OHLCV bars for a security.
    ///
    /// # Examples
    ///
    ///   ferrofeed prices 600519 --start 2024-01-02 --end 2024-01-31
    ///   ferrofeed prices RB0 --asset futures --start 2024-01-05 --format table
    Prices(PricesArgs),

    /// Fetch financial metric snapshots reported on or before a date.
    Metrics(MetricsArgs),

    /// Search named line items from financial statements.
    ///
    /// # Examples
    ///
    ///   ferrofeed line-items AAPL revenue net_income --end 2024-01-01
    LineItems(LineItemsArgs),

    /// Fetch insider trades filed in a window, newest first.
    InsiderTrades(InsiderTradesArgs),

    /// Fetch company news in a window, newest first.
    News(NewsArgs),

    /// Market capitalization from the latest metric snapshot.
    MarketCap(MarketCapArgs),

    /// Persistent cache management.
    Cache(CacheArgs),
}

/// How a retrieval command treats the cache.
#[derive(Debug, Clone, Copy, Args)]
pub struct CacheModeArgs {
    /// Ignore cached coverage and fetch, then update the cache.
    #[arg(long, default_value_t = false, conflicts_with = "no_cache")]
    pub refresh: bool,

    /// Neither read nor write the cache.
    #[arg(long, default_value_t = false)]
    pub no_cache: bool,
}

impl CacheModeArgs {
    pub fn mode(self) -> CacheMode {
        if self.no_cache {
            CacheMode::Bypass
        } else if self.refresh {
            CacheMode::Refresh
        } else {
            CacheMode::Use
        }
    }
}

/// Arguments for the `prices` command.
#[derive(Debug, Args)]
pub struct PricesArgs {
    /// Security symbol (e.g. 600519, AAPL, RB0).
    pub symbol: String,

    /// Asset class: a (domestic), us (foreign) or futures (derivative).
    #[arg(long, default_value = "a")]
    pub asset: String,

    /// First date of the window (YYYY-MM-DD).
    #[arg(long)]
    pub start: String,

    /// Last date of the window (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    pub end: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    #[command(flatten)]
    pub cache_mode: CacheModeArgs,
}

/// Arguments for the `metrics` command.
#[derive(Debug, Args)]
pub struct MetricsArgs {
    pub symbol: String,

    /// Latest report period to include (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    pub end: Option<String>,

    /// Reporting period: ttm, annual or quarterly.
    #[arg(long)]
    pub period: Option<String>,

    /// Maximum number of snapshots.
    #[arg(long)]
    pub limit: Option<usize>,

    #[command(flatten)]
    pub cache_mode: CacheModeArgs,
}

/// Arguments for the `line-items` command.
#[derive(Debug, Args)]
pub struct LineItemsArgs {
    pub symbol: String,

    /// Line item names (e.g. revenue, net_income).
    #[arg(required = true, num_args = 1..)]
    pub line_items: Vec<String>,

    #[arg(long)]
    pub end: Option<String>,

    #[arg(long)]
    pub period: Option<String>,

    #[arg(long)]
    pub limit: Option<usize>,

    #[command(flatten)]
    pub cache_mode: CacheModeArgs,
}

/// Arguments for the `insider-trades` command.
#[derive(Debug, Args)]
pub struct InsiderTradesArgs {
    pub symbol: String,

    /// Earliest filing date; without it only the newest page is fetched.
    #[arg(long)]
    pub start: Option<String>,

    #[arg(long)]
    pub end: Option<String>,

    /// Records requested per page.
    #[arg(long)]
    pub page_limit: Option<usize>,

    #[command(flatten)]
    pub cache_mode: CacheModeArgs,
}

/// Arguments for the `news` command.
#[derive(Debug, Args)]
pub struct NewsArgs {
    pub symbol: String,

    #[arg(long, default_value = "a")]
    pub asset: String,

    #[arg(long)]
    pub start: Option<String>,

    #[arg(long)]
    pub end: Option<String>,

    /// Maximum number of articles.
    #[arg(long)]
    pub limit: Option<usize>,

    #[command(flatten)]
    pub cache_mode: CacheModeArgs,
}

/// Arguments for the `market-cap` command.
#[derive(Debug, Args)]
pub struct MarketCapArgs {
    pub symbol: String,

    /// Valuation date (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    pub as_of: Option<String>,
}

/// Arguments for the `cache` command group.
#[derive(Debug, Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

/// Cache management subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// List cached keys with record counts.
    List,

    /// Remove cached entries.
    Clear(CacheClearArgs),
}

/// Arguments for `cache clear`.
#[derive(Debug, Args)]
pub struct CacheClearArgs {
    /// Only clear one record family (prices, financial_metrics, line_items,
    /// insider_trades, company_news).
    #[arg(long)]
    pub kind: Option<String>,
}
