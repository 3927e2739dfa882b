use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::analysis::MarketGate;
use crate::config::ScreenerConfig;
use crate::domain::MarketData;

use super::fetch::Fetcher;
use super::messages::{BatchReport, SymbolOutcome, SymbolReport};
use super::worker::run_analysis;

/// Online batch runner: bounded concurrency over a shared [`Fetcher`], with CPU
/// analysis on the blocking pool.
pub struct BatchScreener {
    fetcher: Fetcher,
    config: Arc<ScreenerConfig>,
    market_gate: MarketGate,

    permits: Arc<Semaphore>,
    retain_data: bool,
}

/// Everything one symbol task needs, cloned cheaply per spawn.
#[derive(Clone)]
struct TaskContext {
    fetcher: Fetcher,
    config: Arc<ScreenerConfig>,
    market_gate: MarketGate,
    permits: Arc<Semaphore>,
    retain_data: bool,
}

impl TaskContext {
    fn cancelled(&self) -> bool {
        self.fetcher.is_cancelled()
    }
}

impl BatchScreener {
    pub fn new(fetcher: Fetcher, config: ScreenerConfig, market_gate: MarketGate) -> Self {
        let permits = Arc::new(Semaphore::new(config.engine.max_concurrency.max(1)));
        Self {
            fetcher,
            config: Arc::new(config),
            market_gate,
            permits,
            retain_data: false,
        }
    }

    /// Keep each symbol's fetched data in its report, for a snapshot write afterwards.
    pub fn with_retained_data(mut self, retain: bool) -> Self {
        self.retain_data = retain;
        self
    }

    /// Shared flag; setting it abandons every symbol that has not finished.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.fetcher.cancel_flag()
    }

    pub fn cancel(&self) {
        self.fetcher.cancel_flag().store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.fetcher.is_cancelled()
    }

    fn task_context(&self) -> TaskContext {
        TaskContext {
            fetcher: self.fetcher.clone(),
            config: self.config.clone(),
            market_gate: self.market_gate,
            permits: self.permits.clone(),
            retain_data: self.retain_data,
        }
    }

    /// Screen the configured window of `symbols`. Per-symbol failures are reported,
    /// never propagated.
    pub async fn run(&self, symbols: &[String]) -> BatchReport {
        let start = Instant::now();
        let window = self.config.engine.window(symbols);
        let batch_size = self.config.engine.batch_size.max(1);
        let batch_count = window.len().div_ceil(batch_size);

        log::info!(
            "Screening {} of {} symbols via {} ({} per batch, {} concurrent)",
            window.len(),
            symbols.len(),
            self.fetcher.signature(),
            batch_size,
            self.config.engine.max_concurrency.max(1)
        );

        let mut reports: Vec<SymbolReport> = Vec::with_capacity(window.len());
        for (batch_idx, batch) in window.chunks(batch_size).enumerate() {
            let batch_start = Instant::now();
            log::info!(
                "--- Processing batch {}/{} ({} symbols) ---",
                batch_idx + 1,
                batch_count,
                batch.len()
            );

            let handles: Vec<JoinHandle<SymbolReport>> = batch
                .iter()
                .map(|symbol| tokio::spawn(screen_one(self.task_context(), symbol.clone())))
                .collect();

            for (symbol, joined) in batch.iter().zip(join_all(handles).await) {
                let report = joined.unwrap_or_else(|e| SymbolReport {
                    symbol: symbol.clone(),
                    duration_ms: 0,
                    outcome: SymbolOutcome::Failed(format!("task panicked: {}", e)),
                    data: None,
                });
                match &report.outcome {
                    SymbolOutcome::Failed(reason) => log::warn!("{}: {}", report.symbol, reason),
                    outcome => log::debug!("{}: {}", report.symbol, outcome),
                }
                reports.push(report);
            }

            log::info!(
                "Batch {}/{} done in {:?}",
                batch_idx + 1,
                batch_count,
                batch_start.elapsed()
            );
        }

        let report = BatchReport::from_reports(reports, start.elapsed().as_millis());
        report.log_summary();
        report
    }
}

async fn screen_one(ctx: TaskContext, symbol: String) -> SymbolReport {
    let start = Instant::now();
    let retain_data = ctx.retain_data;
    let finish = |outcome: SymbolOutcome, data: Option<MarketData>| SymbolReport {
        symbol: symbol.clone(),
        duration_ms: start.elapsed().as_millis(),
        outcome,
        data: data.filter(|_| retain_data),
    };

    let _permit = match ctx.permits.clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(e) => return finish(SymbolOutcome::Failed(format!("semaphore closed: {}", e)), None),
    };
    if ctx.cancelled() {
        return finish(SymbolOutcome::Cancelled, None);
    }

    let data = match ctx.fetcher.fetch(&symbol).await {
        Ok(data) => data,
        Err(_) if ctx.cancelled() => return finish(SymbolOutcome::Cancelled, None),
        Err(e) => return finish(SymbolOutcome::Failed(format!("{:#}", e)), None),
    };
    if ctx.cancelled() {
        return finish(SymbolOutcome::Cancelled, Some(data));
    }

    let config = ctx.config.clone();
    let market_gate = ctx.market_gate;
    let analysed = tokio::task::spawn_blocking(move || {
        let outcome = run_analysis(&data, &config, &market_gate);
        (outcome, data)
    })
    .await;

    match analysed {
        Ok((outcome, data)) => finish(outcome, Some(data)),
        Err(e) => finish(SymbolOutcome::Failed(format!("analysis task failed: {}", e)), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use crate::data::{InMemoryProvider, MarketDataProvider};
    use crate::domain::{Bar, DAILY, Series};
    use crate::engine::fetch::tests::{Flaky, Slow};

    fn flat_symbol(symbol: &str, n: usize) -> MarketData {
        let bars: Vec<Bar> = (0..n)
            .map(|i| Bar::new(i as i64, 100.0, 100.0, 100.0, 100.0, 100_000.0))
            .collect();
        MarketData::new(symbol).with_series(Series::from_bars(DAILY, &bars).unwrap())
    }

    fn fast_config() -> ScreenerConfig {
        let mut config = ScreenerConfig::default();
        config.engine.requests_per_second = 0.0;
        config.engine.fetch_timeout_ms = 50;
        config.engine.retries = 1;
        config.engine.backoff_ms = 1;
        config.engine.batch_size = 2;
        config
    }

    fn screener(provider: impl MarketDataProvider + 'static) -> BatchScreener {
        let config = fast_config();
        let fetcher = Fetcher::new(Arc::new(provider), &config.engine);
        BatchScreener::new(fetcher, config, MarketGate::OPEN)
    }

    fn symbols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn reports_follow_input_order_with_per_symbol_failures() {
        let provider = InMemoryProvider::new([flat_symbol("AAA", 80), flat_symbol("CCC", 80)]);
        let screener = screener(provider).with_retained_data(true);

        let mut report = screener.run(&symbols(&["AAA", "BBB", "CCC"])).await;

        let names: Vec<&str> = report.reports.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(names, vec!["AAA", "BBB", "CCC"]);
        assert!(matches!(report.reports[1].outcome, SymbolOutcome::Failed(_)), "missing symbol fails");
        assert_eq!(report.screened(), 2);
        assert_eq!(report.take_loaded_data().len(), 2);
    }

    #[tokio::test]
    async fn fetched_data_is_dropped_unless_retained() {
        let provider = InMemoryProvider::new([flat_symbol("AAA", 80), flat_symbol("BBB", 80)]);
        let report = screener(provider).run(&symbols(&["AAA", "BBB"])).await;

        assert_eq!(report.screened(), 2);
        assert!(report.reports.iter().all(|r| r.data.is_none()));
    }

    #[tokio::test]
    async fn transient_errors_are_retried() {
        let provider = Flaky {
            inner: InMemoryProvider::new([flat_symbol("AAA", 80)]),
            failures: 1,
            calls: AtomicUsize::new(0),
        };
        let report = screener(provider).run(&symbols(&["AAA"])).await;
        assert_eq!(report.screened(), 1);
    }

    #[tokio::test]
    async fn slow_fetches_time_out_as_failures() {
        let start = Instant::now();
        let report = screener(Slow).run(&symbols(&["AAA", "BBB"])).await;

        assert_eq!(report.failed(), 2);
        assert!(start.elapsed() < Duration::from_secs(2), "timeouts cut the slow provider off");
        match &report.reports[0].outcome {
            SymbolOutcome::Failed(reason) => assert!(reason.contains("timed out"), "{}", reason),
            other => panic!("expected failure, got {}", other),
        }
    }

    #[tokio::test]
    async fn cancelled_batch_abandons_symbols() {
        let screener = screener(InMemoryProvider::new([flat_symbol("AAA", 80)]));
        screener.cancel();
        assert!(screener.is_cancelled());

        let report = screener.run(&symbols(&["AAA", "BBB"])).await;
        assert_eq!(report.cancelled(), 2);
        assert!(report.opportunities.is_empty());
    }
}
