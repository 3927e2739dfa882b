//! Batch engine configuration: concurrency, rate limiting and retries.

use serde::{Deserialize, Serialize};

/// Default values for provider fetches
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_FETCH_RETRIES: u32 = 2;
pub const DEFAULT_BACKOFF_MS: u64 = 1_000;
pub const DEFAULT_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of symbols fetched and analysed at once
    pub max_concurrency: usize,
    /// Shared ceiling on provider fetches across all tasks
    pub requests_per_second: f64,
    pub fetch_timeout_ms: u64,
    pub retries: u32,
    /// Delay before the first retry; doubles on each further attempt
    pub backoff_ms: u64,
    /// Symbols per progress batch
    pub batch_size: usize,
    /// Batch window over the symbol list
    pub start_from: usize,
    pub max_symbols: Option<usize>,
    /// Apply pre-screen and opportunity validation filters
    pub apply_filters: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            requests_per_second: 10.0,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            retries: DEFAULT_FETCH_RETRIES,
            backoff_ms: DEFAULT_BACKOFF_MS,
            batch_size: DEFAULT_BATCH_SIZE,
            start_from: 0,
            max_symbols: None,
            apply_filters: true,
        }
    }
}

impl EngineConfig {
    /// Minimum spacing between two fetches, or zero when unthrottled.
    pub fn min_request_interval(&self) -> std::time::Duration {
        if self.requests_per_second > 0.0 && self.requests_per_second.is_finite() {
            std::time::Duration::from_secs_f64(1.0 / self.requests_per_second)
        } else {
            std::time::Duration::ZERO
        }
    }

    /// Symbols selected by `start_from` and `max_symbols`.
    pub fn window<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.start_from.min(items.len());
        let end = match self.max_symbols {
            Some(max) => start.saturating_add(max).min(items.len()),
            None => items.len(),
        };
        &items[start..end]
    }
}
