//! Configuration module for the setup screener.

pub mod analysis;
pub mod engine;

mod debug; // Private: use crate::config::DEBUG_FLAGS
pub use debug::DEBUG_FLAGS;

pub mod persistence;
pub mod trading;

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// Re-export commonly used items
pub use analysis::{
    AnalysisConfig, FibonacciSettings, LevelSettings, StructureSettings, TrendlineSettings,
    ZoneSettings,
};
pub use engine::EngineConfig;
pub use persistence::{PersistenceConfig, SNAPSHOT_VERSION, snapshot_filename};
pub use trading::{EntrySettings, PreScreenSettings, RiskLimits, TradingConfig};

/// Complete runtime configuration. Every section falls back to its defaults, so a
/// JSON override file only needs the fields it changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerConfig {
    pub analysis: AnalysisConfig,
    pub trading: TradingConfig,
    pub engine: EngineConfig,
    pub persistence: PersistenceConfig,
}

impl ScreenerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse screener config JSON")
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("Invalid config in {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let json = r#"{
            "trading": { "entry": { "min_risk_reward": 3.0 } },
            "engine": { "max_concurrency": 2, "max_symbols": 10 }
        }"#;
        let config = ScreenerConfig::from_json_str(json).unwrap();

        assert_eq!(config.trading.entry.min_risk_reward, 3.0);
        assert_eq!(config.trading.entry.hourly_window, 200, "untouched field keeps default");
        assert_eq!(config.trading.risk.min_confluence_score, 5.0);
        assert_eq!(config.engine.max_concurrency, 2);
        assert_eq!(config.engine.max_symbols, Some(10));
        assert_eq!(config.analysis.zones.offsets.len(), 14);
    }

    #[test]
    fn rate_limit_converts_to_spacing() {
        let engine = EngineConfig {
            requests_per_second: 4.0,
            ..Default::default()
        };
        assert_eq!(engine.min_request_interval().as_millis(), 250);

        let unthrottled = EngineConfig {
            requests_per_second: 0.0,
            ..Default::default()
        };
        assert!(unthrottled.min_request_interval().is_zero());
    }

    #[test]
    fn batch_window_clamps_to_symbol_list() {
        let symbols = ["A", "B", "C", "D", "E"];
        let engine = EngineConfig {
            start_from: 1,
            max_symbols: Some(2),
            ..Default::default()
        };
        assert_eq!(engine.window(&symbols), &["B", "C"]);

        let past_end = EngineConfig {
            start_from: 4,
            max_symbols: Some(10),
            ..Default::default()
        };
        assert_eq!(past_end.window(&symbols), &["E"]);

        let beyond = EngineConfig {
            start_from: 9,
            ..Default::default()
        };
        assert!(beyond.window(&symbols).is_empty());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(ScreenerConfig::from_json_str("{ not json").is_err());
    }
}
