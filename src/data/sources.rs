// Async setup run in main before any screening starts

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};

use crate::config::PersistenceConfig;
use crate::data::cache_file::{SnapshotProvider, check_snapshot_validity};
use crate::data::json_dir::{JsonDirProvider, load_symbol_list};
use crate::data::provider::{FallbackProvider, MarketDataProvider};

/// Where symbols come from and which provider chain serves them.
pub struct DataSources {
    pub provider: Arc<dyn MarketDataProvider>,
    pub symbols: Vec<String>,
    /// Signature of the provider tried first
    pub primary: &'static str,
}

impl DataSources {
    /// Only data read from the JSON directory is worth re-snapshotting.
    pub fn should_write_snapshot(&self) -> bool {
        self.primary == JsonDirProvider::SIGNATURE
    }
}

/// Build the provider chain. A valid snapshot joins the JSON directory, first when
/// `prefer_cache` is set; a missing or stale one leaves the JSON directory alone.
pub async fn load_data_sources(
    persistence: &PersistenceConfig,
    symbols_file: Option<&PathBuf>,
    prefer_cache: bool,
) -> Result<DataSources> {
    let json = JsonDirProvider::new(&persistence.data_dir);

    let snapshot = match check_snapshot_validity(
        &persistence.cache_path(),
        persistence.cache_max_age_secs,
        persistence.cache_version,
    ) {
        Ok(cache) => Some(SnapshotProvider::new(cache)),
        Err(e) => {
            log::warn!("Local snapshot unusable: {:#}", e);
            None
        }
    };

    let symbols = match symbols_file {
        Some(path) => load_symbol_list(path).await?,
        None => match json.list_symbols().await {
            Ok(symbols) if !symbols.is_empty() => symbols,
            Ok(_) | Err(_) => match &snapshot {
                Some(snapshot) => {
                    log::info!("No JSON data found, using symbols from the snapshot");
                    snapshot.symbols()
                }
                None => bail!(
                    "No symbols: {} has no JSON files and there is no valid snapshot",
                    persistence.data_dir.display()
                ),
            },
        },
    };

    let (providers, primary): (Vec<Box<dyn MarketDataProvider>>, &'static str) =
        match (prefer_cache, snapshot) {
            (true, Some(snapshot)) => (
                vec![Box::new(snapshot), Box::new(json)],
                SnapshotProvider::SIGNATURE,
            ), // snapshot first
            (false, Some(snapshot)) => (
                vec![Box::new(json), Box::new(snapshot)],
                JsonDirProvider::SIGNATURE,
            ), // disk JSON first
            (_, None) => (vec![Box::new(json)], JsonDirProvider::SIGNATURE),
        };

    log::info!("{} symbols, primary source: {}", symbols.len(), primary);
    Ok(DataSources {
        provider: Arc::new(FallbackProvider::new(providers)),
        symbols,
        primary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACME: &str = r#"{"timeframes": {"daily": [
        {"timestamp_ms": 1, "open": 10.0, "high": 11.0, "low": 9.0, "close": 10.5, "volume": 100.0}
    ]}}"#;

    fn temp_config(name: &str) -> PersistenceConfig {
        let root = std::env::temp_dir().join(format!("setup_screener_{}_{}", std::process::id(), name));
        PersistenceConfig {
            data_dir: root.join("json"),
            cache_dir: root.join("cache"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn json_directory_supplies_symbols_without_snapshot() {
        let config = temp_config("sources");
        std::fs::create_dir_all(&config.data_dir).unwrap();
        std::fs::write(config.data_dir.join("ACME.json"), ACME).unwrap();
        std::fs::write(config.data_dir.join("notes.txt"), "ignored").unwrap();

        let sources = load_data_sources(&config, None, true).await.unwrap();
        assert_eq!(sources.symbols, vec!["ACME"]);
        assert_eq!(sources.primary, JsonDirProvider::SIGNATURE, "no snapshot to prefer");
        assert!(sources.should_write_snapshot());
        assert!(sources.provider.fetch("ACME").await.is_ok());

        let _ = std::fs::remove_dir_all(config.data_dir.parent().unwrap());
    }

    #[tokio::test]
    async fn nothing_to_screen_is_an_error() {
        let config = temp_config("empty");
        assert!(load_data_sources(&config, None, false).await.is_err());
    }
}
