//! File persistence and serialization configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Directory holding one `<SYMBOL>.json` file per symbol
pub const MARKET_DATA_PATH: &str = "market_data";

/// Base filename for the bincode snapshot (without extension)
pub const SNAPSHOT_FILENAME_WITHOUT_EXT: &str = "market_snapshot";

/// Current version of the snapshot serialization format
pub const SNAPSHOT_VERSION: f64 = 1.0;

/// Maximum age of a snapshot before it is ignored (24 hours)
pub const SNAPSHOT_MAX_AGE_SECS: i64 = 86_400;

/// Snapshot filename for the current format version.
/// Example: "market_snapshot_v1.bin"
pub fn snapshot_filename() -> String {
    format!("{}_v{}.bin", SNAPSHOT_FILENAME_WITHOUT_EXT, SNAPSHOT_VERSION)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub data_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub cache_version: f64,
    pub cache_max_age_secs: i64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(MARKET_DATA_PATH),
            cache_dir: PathBuf::from(MARKET_DATA_PATH),
            cache_version: SNAPSHOT_VERSION,
            cache_max_age_secs: SNAPSHOT_MAX_AGE_SECS,
        }
    }
}

impl PersistenceConfig {
    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir.join(snapshot_filename())
    }
}
