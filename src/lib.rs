#![allow(clippy::collapsible_if)]
#![allow(clippy::type_complexity)]

// Core modules
pub mod analysis;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod models;
pub mod utils;

use std::path::PathBuf;

// Re-export commonly used types
pub use analysis::{MarketGate, SymbolAnalysis, analyze_symbol, screen_symbol};
pub use config::ScreenerConfig;
pub use data::{DataSources, MarketDataProvider, load_data_sources};
pub use domain::{Bar, MarketData, Series};
pub use engine::{
    BatchReport, BatchScreener, Fetcher, ScreeningSummary, screen_collection, screen_offline,
};
pub use models::{LiquidityZone, TradingOpportunity};

// CLI argument parsing
use clap::{Parser, ValueEnum};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Multi-timeframe trading setup screener", long_about = None)]
pub struct Cli {
    /// Directory of <SYMBOL>.json market data files (overrides the config file)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// File with one symbol per line; defaults to every JSON file in the data directory
    #[arg(long)]
    pub symbols_file: Option<PathBuf>,

    /// Analyse a single symbol and print its detailed report
    #[arg(long)]
    pub symbol: Option<String>,

    /// Market index symbol used to gate trading on broad-market volatility
    #[arg(long)]
    pub index_symbol: Option<String>,

    /// JSON file overriding any part of the default configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write JSON results here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Use the local snapshot as primary source instead of the JSON directory
    #[arg(long, default_value_t = false)]
    pub prefer_cache: bool,

    /// Load every symbol first, then screen them in parallel without rate limiting
    #[arg(long, default_value_t = false)]
    pub offline: bool,

    /// Skip the first N symbols
    #[arg(long)]
    pub start_from: Option<usize>,

    /// Screen at most N symbols
    #[arg(long)]
    pub max_symbols: Option<usize>,

    /// Report every detected opportunity, skipping pre-screen and validation
    #[arg(long, default_value_t = false)]
    pub no_filters: bool,

    /// Log level; RUST_LOG applies when unset
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,
}

impl Cli {
    /// Load the config file (or defaults) and apply command-line overrides.
    pub fn resolve_config(&self) -> anyhow::Result<ScreenerConfig> {
        let mut config = match &self.config {
            Some(path) => ScreenerConfig::load_from_path(path)?,
            None => ScreenerConfig::default(),
        };
        if let Some(dir) = &self.data_dir {
            config.persistence.data_dir = dir.clone();
        }
        if let Some(start) = self.start_from {
            config.engine.start_from = start;
        }
        if self.max_symbols.is_some() {
            config.engine.max_symbols = self.max_symbols;
        }
        if self.no_filters {
            config.engine.apply_filters = false;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_config_defaults() {
        let args = Cli::parse_from([
            "setup-screener",
            "--data-dir",
            "quotes",
            "--max-symbols",
            "5",
            "--no-filters",
            "--log-level",
            "debug",
        ]);
        let config = args.resolve_config().unwrap();

        assert_eq!(config.persistence.data_dir, PathBuf::from("quotes"));
        assert_eq!(config.engine.max_symbols, Some(5));
        assert_eq!(config.engine.start_from, 0);
        assert!(!config.engine.apply_filters);
        assert_eq!(args.log_level, Some(LogLevel::Debug));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let args = Cli::parse_from(["setup-screener", "--config", "no/such/config.json"]);
        assert!(args.resolve_config().is_err());
    }
}
