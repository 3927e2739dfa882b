use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::data::provider::MarketDataProvider;
use crate::domain::{Bar, MarketData, Series};

/// On-disk layout of `<dir>/<SYMBOL>.json`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct MarketDataFile {
    #[serde(default)]
    pub symbol: Option<String>,
    pub timeframes: BTreeMap<String, Vec<Bar>>,
}

impl MarketDataFile {
    /// Validate every timeframe into a Series. The file name wins over any embedded symbol.
    pub fn into_market_data(self, symbol: &str) -> Result<MarketData> {
        let mut data = MarketData::new(symbol);
        for (timeframe, bars) in self.timeframes {
            let series = Series::from_bars(timeframe.as_str(), &bars)
                .with_context(|| format!("{}: invalid {} series", symbol, timeframe))?;
            data = data.with_series(series);
        }
        Ok(data)
    }
}

/// Reads one JSON file per symbol from a directory.
#[derive(Debug, Clone)]
pub struct JsonDirProvider {
    dir: PathBuf,
}

impl JsonDirProvider {
    pub const SIGNATURE: &'static str = "JSON Directory";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.json", symbol))
    }

    /// Symbols with a `.json` file in the directory, sorted.
    pub async fn list_symbols(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Failed to read data directory {}", self.dir.display()))?;
        let mut symbols = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                symbols.push(stem.to_string());
            }
        }
        symbols.sort();
        Ok(symbols)
    }
}

#[async_trait]
impl MarketDataProvider for JsonDirProvider {
    async fn fetch(&self, symbol: &str) -> Result<MarketData> {
        let path = self.path_for(symbol);
        let text = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file: MarketDataFile = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        file.into_market_data(symbol)
    }

    fn signature(&self) -> &'static str {
        Self::SIGNATURE
    }
}

/// One symbol per line; blank lines and `#` comments are skipped, symbols are uppercased.
pub async fn load_symbol_list(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read symbols file {}", path.display()))?;
    Ok(parse_symbol_list(&content))
}

pub fn parse_symbol_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty() && !s.starts_with('#'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DAILY, HOURLY};

    const SAMPLE: &str = r#"{
        "timeframes": {
            "daily": [
                {"timestamp_ms": 1, "open": 10.0, "high": 11.0, "low": 9.0, "close": 10.5, "volume": 100.0},
                {"timestamp_ms": 2, "open": 10.5, "high": 12.0, "low": 10.0, "close": 11.5, "volume": 150.0}
            ],
            "hourly": []
        }
    }"#;

    #[test]
    fn parses_file_into_market_data() {
        let file: MarketDataFile = serde_json::from_str(SAMPLE).unwrap();
        let data = file.into_market_data("ACME").unwrap();

        assert_eq!(data.symbol, "ACME");
        assert_eq!(data.daily().map(Series::len), Some(2));
        assert_eq!(data.current_price(), Some(11.5));
        assert!(data.timeframes.contains_key(HOURLY));
        assert!(data.hourly().is_none(), "empty timeframe reads as absent");
    }

    #[test]
    fn unordered_bars_are_rejected() {
        let mut file: MarketDataFile = serde_json::from_str(SAMPLE).unwrap();
        if let Some(bars) = file.timeframes.get_mut(DAILY) {
            bars.reverse();
        }
        assert!(file.into_market_data("ACME").is_err());
    }

    #[test]
    fn symbol_list_skips_blanks_and_comments() {
        let symbols = parse_symbol_list("acme\n\n # comment\n  globex  \n#x\n");
        assert_eq!(symbols, vec!["ACME", "GLOBEX"]);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let provider = JsonDirProvider::new("definitely/not/a/real/dir");
        assert!(provider.fetch("ACME").await.is_err());
    }
}
