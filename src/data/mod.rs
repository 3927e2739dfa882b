//! Market data sources: JSON files on disk, a bincode snapshot, and in-memory sets.

pub mod cache_file;
pub mod json_dir;
pub mod provider;
pub mod sources;

pub use cache_file::{CacheFile, SnapshotProvider, check_snapshot_validity, write_snapshot_async};
pub use json_dir::{JsonDirProvider, MarketDataFile, load_symbol_list};
pub use provider::{FallbackProvider, InMemoryProvider, MarketDataProvider};
pub use sources::{DataSources, load_data_sources};
