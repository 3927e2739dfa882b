use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(debug_assertions)]
use crate::config::DEBUG_FLAGS;
use crate::data::provider::{InMemoryProvider, MarketDataProvider};
use crate::domain::MarketData;
use crate::utils::time_utils::{how_many_seconds_ago, local_now_as_timestamp_ms};

/// Bincode snapshot of every symbol loaded during a run.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CacheFile {
    pub version: f64,
    pub timestamp_ms: i64,
    pub data: Vec<MarketData>,
}

impl CacheFile {
    pub fn new(data: Vec<MarketData>, version: f64) -> Self {
        Self {
            version,
            timestamp_ms: local_now_as_timestamp_ms(),
            data,
        }
    }

    /// Decode a snapshot. Every series is re-validated during decoding, so uneven
    /// or unordered columns are rejected here rather than panicking later.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        bincode::deserialize(&bytes)
            .with_context(|| format!("Corrupt snapshot {} ({} bytes)", path.display(), bytes.len()))
    }

    /// Encode to a sibling temp file, then rename over `path` so readers never see a
    /// half-written snapshot.
    pub fn store(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create snapshot directory {}", dir.display()))?;
        }
        let bytes = bincode::serialize(self).context("Failed to encode snapshot")?;
        let staging = path.with_extension("tmp");
        fs::write(&staging, &bytes)
            .with_context(|| format!("Failed to write {}", staging.display()))?;
        fs::rename(&staging, path)
            .with_context(|| format!("Failed to move snapshot into {}", path.display()))
    }
}

/// Load the snapshot at `path` and reject it when the version differs or it is too old.
pub fn check_snapshot_validity(
    path: &Path,
    recency_required_secs: i64,
    version_required: f64,
) -> Result<CacheFile> {
    #[cfg(debug_assertions)]
    if DEBUG_FLAGS.print_serde {
        log::info!("Checking validity of snapshot at {:?}...", path);
    }
    let cache = CacheFile::load(path)?;

    if cache.version != version_required {
        bail!(
            "Snapshot version mismatch: file v{} vs required v{}",
            cache.version,
            version_required
        );
    }

    let seconds_ago = how_many_seconds_ago(cache.timestamp_ms);
    if seconds_ago > recency_required_secs {
        bail!(
            "Snapshot too old: created {} seconds ago (limit: {} seconds)",
            seconds_ago,
            recency_required_secs
        );
    }

    #[cfg(debug_assertions)]
    if DEBUG_FLAGS.print_serde {
        log::info!(
            "Snapshot valid: v{}, {}s old (limit {}s), {} symbols",
            cache.version,
            seconds_ago,
            recency_required_secs,
            cache.data.len()
        );
    }

    Ok(cache)
}

/// Write the snapshot on the blocking pool so the runtime keeps serving other tasks.
pub async fn write_snapshot_async(
    path: PathBuf,
    data: Vec<MarketData>,
    version: f64,
) -> Result<()> {
    if data.is_empty() {
        log::debug!("Skipping snapshot write (no data)");
        return Ok(());
    }

    tokio::task::spawn_blocking(move || {
        let cache = CacheFile::new(data, version);
        cache.store(&path)?;

        #[cfg(debug_assertions)]
        if DEBUG_FLAGS.print_serde {
            log::info!(
                "Wrote {} symbols to snapshot {}",
                cache.data.len(),
                path.display()
            );
        }
        Ok(())
    })
    .await
    .map_err(|e| anyhow!("Snapshot writer task failed: {}", e))?
}

/// Serves symbols from a validated snapshot.
pub struct SnapshotProvider {
    inner: InMemoryProvider,
}

impl SnapshotProvider {
    pub const SIGNATURE: &'static str = "Local Snapshot";

    pub fn new(cache: CacheFile) -> Self {
        Self {
            inner: InMemoryProvider::new(cache.data),
        }
    }

    pub fn symbols(&self) -> Vec<String> {
        self.inner.symbols()
    }
}

#[async_trait]
impl MarketDataProvider for SnapshotProvider {
    async fn fetch(&self, symbol: &str) -> Result<MarketData> {
        self.inner
            .fetch(symbol)
            .await
            .with_context(|| format!("{} not in snapshot", symbol))
    }

    fn signature(&self) -> &'static str {
        Self::SIGNATURE
    }
}
