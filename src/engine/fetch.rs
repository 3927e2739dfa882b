use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::time::{sleep, timeout};

#[cfg(debug_assertions)]
use crate::config::DEBUG_FLAGS;
use crate::config::EngineConfig;
use crate::data::MarketDataProvider;
use crate::domain::MarketData;

use super::gate::RateGate;

/// The one way symbols are fetched: every call passes the shared rate gate, carries a
/// timeout, and is retried with doubling backoff.
#[derive(Clone)]
pub struct Fetcher {
    provider: Arc<dyn MarketDataProvider>,
    rate_gate: Arc<RateGate>,
    fetch_timeout: Duration,
    retries: u32,
    backoff: Duration,
    cancelled: Arc<AtomicBool>,
}

impl Fetcher {
    pub fn new(provider: Arc<dyn MarketDataProvider>, engine: &EngineConfig) -> Self {
        Self {
            provider,
            rate_gate: Arc::new(RateGate::new(engine.min_request_interval())),
            fetch_timeout: Duration::from_millis(engine.fetch_timeout_ms),
            retries: engine.retries,
            backoff: Duration::from_millis(engine.backoff_ms),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn signature(&self) -> &'static str {
        self.provider.signature()
    }

    /// Shared flag; setting it stops further attempts.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub async fn fetch(&self, symbol: &str) -> Result<MarketData> {
        let attempts = self.retries + 1;
        let mut backoff = self.backoff;
        let mut last_error = anyhow!("no fetch attempted");

        for attempt in 1..=attempts {
            if self.is_cancelled() {
                return Err(last_error.context("cancelled before retry"));
            }
            self.rate_gate.wait().await;

            #[cfg(debug_assertions)]
            if DEBUG_FLAGS.print_fetch_events {
                log::info!("[fetch] {} attempt {}/{}", symbol, attempt, attempts);
            }

            last_error = match timeout(self.fetch_timeout, self.provider.fetch(symbol)).await {
                Ok(Ok(data)) => return Ok(data),
                Ok(Err(e)) => e,
                Err(_) => anyhow!("fetch timed out after {:?}", self.fetch_timeout),
            };

            if attempt < attempts {
                log::debug!(
                    "{}: attempt {}/{} failed ({:#}), retrying in {:?}",
                    symbol,
                    attempt,
                    attempts,
                    last_error,
                    backoff
                );
                sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
            }
        }

        Err(last_error.context(format!("{} failed after {} attempts", symbol, attempts)))
    }
}
