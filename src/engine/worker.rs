use std::time::Instant;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use rayon::prelude::*;

use crate::analysis::{MarketGate, screen_symbol};
use crate::config::ScreenerConfig;
use crate::domain::MarketData;

use super::fetch::Fetcher;
use super::messages::{BatchReport, SymbolOutcome, SymbolReport};

/// Run the CPU-bound pipeline for one symbol. Pure apart from logging.
pub fn run_analysis(data: &MarketData, config: &ScreenerConfig, gate: &MarketGate) -> SymbolOutcome {
    match screen_symbol(data, config, gate) {
        Ok(opportunities) => SymbolOutcome::Screened(opportunities),
        Err(skip) => SymbolOutcome::Skipped(skip.to_string()),
    }
}

/// Offline path: screen already loaded data in parallel across the rayon pool.
/// The engine's batch window applies; results keep input order.
pub fn screen_collection(
    data: &[MarketData],
    config: &ScreenerConfig,
    gate: &MarketGate,
) -> BatchReport {
    let start = Instant::now();
    let window = config.engine.window(data);

    let reports: Vec<SymbolReport> = window
        .par_iter()
        .map(|md| {
            let symbol_start = Instant::now();
            let outcome = run_analysis(md, config, gate);
            log::debug!("{}: {}", md.symbol, outcome);
            SymbolReport {
                symbol: md.symbol.clone(),
                duration_ms: symbol_start.elapsed().as_millis(),
                outcome,
                data: None,
            }
        })
        .collect();

    BatchReport::from_reports(reports, start.elapsed().as_millis())
}

/// Fetch the whole window through `fetcher` (bounded by `max_concurrency`), then
/// screen everything on the rayon pool. Failed fetches are reported in place.
pub async fn screen_offline(
    fetcher: &Fetcher,
    symbols: &[String],
    config: &ScreenerConfig,
    gate: &MarketGate,
    retain_data: bool,
) -> BatchReport {
    let start = Instant::now();
    let window: Vec<String> = config.engine.window(symbols).to_vec();
    log::info!(
        "Loading {} of {} symbols via {} for offline screening",
        window.len(),
        symbols.len(),
        fetcher.signature()
    );

    let fetched: Vec<Result<MarketData>> = stream::iter(window.iter())
        .map(|symbol| fetcher.fetch(symbol))
        .buffered(config.engine.max_concurrency.max(1))
        .collect()
        .await;
    let cancelled = fetcher.is_cancelled();

    let config = config.clone();
    let gate = *gate;
    let screened = tokio::task::spawn_blocking(move || {
        window
            .into_par_iter()
            .zip(fetched.into_par_iter())
            .map(|(symbol, fetch_result)| {
                let symbol_start = Instant::now();
                let (outcome, data) = match fetch_result {
                    Ok(data) => (run_analysis(&data, &config, &gate), Some(data)),
                    Err(_) if cancelled => (SymbolOutcome::Cancelled, None),
                    Err(e) => (SymbolOutcome::Failed(format!("{:#}", e)), None),
                };
                log::debug!("{}: {}", symbol, outcome);
                SymbolReport {
                    symbol,
                    duration_ms: symbol_start.elapsed().as_millis(),
                    outcome,
                    data: data.filter(|_| retain_data),
                }
            })
            .collect::<Vec<SymbolReport>>()
    })
    .await;

    let reports = screened.unwrap_or_else(|e| {
        log::error!("Offline screening task failed: {}", e);
        Vec::new()
    });
    let report = BatchReport::from_reports(reports, start.elapsed().as_millis());
    report.log_summary();
    report
}
