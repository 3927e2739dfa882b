use std::io::Write;
use std::path::Path;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio::runtime::Runtime;

use setup_screener::data::write_snapshot_async;
use setup_screener::{
    BatchScreener, Cli, Fetcher, MarketGate, ScreenerConfig, ScreeningSummary,
    TradingOpportunity, analyze_symbol, load_data_sources, screen_offline,
};

#[derive(Serialize)]
struct ScreeningOutput<'a> {
    summary: &'a ScreeningSummary,
    opportunities: &'a [TradingOpportunity],
}

fn main() -> Result<()> {
    // A. Parse Args, Init Logging
    let args = Cli::parse();
    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = args.log_level {
        logger.filter_level(level.into());
    }
    logger.init();

    #[cfg(debug_assertions)]
    log::info!("Parsed arguments: {:?}", args);

    let config = args.resolve_config()?;
    let rt = Runtime::new().context("Failed to create Tokio runtime")?;

    // B. Data sources and market gate
    let sources = rt.block_on(load_data_sources(
        &config.persistence,
        args.symbols_file.as_ref(),
        args.prefer_cache,
    ))?;
    // Every fetch below shares this gate, timeout and retry policy
    let fetcher = Fetcher::new(sources.provider.clone(), &config.engine);
    let gate = rt.block_on(market_gate(&fetcher, &args, &config));

    // C. Single symbol diagnostic
    if let Some(symbol) = &args.symbol {
        let data = rt
            .block_on(fetcher.fetch(symbol))
            .with_context(|| format!("Failed to load {}", symbol))?;
        let analysis = analyze_symbol(&data, &config, &gate);
        return write_json(&analysis, args.output.as_deref());
    }

    // D. Batch screening
    let cancel = fetcher.cancel_flag();
    rt.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, abandoning remaining symbols...");
            cancel.store(true, Ordering::SeqCst);
        }
    });
    let retain_data = sources.should_write_snapshot();
    let mut report = if args.offline {
        rt.block_on(screen_offline(
            &fetcher,
            &sources.symbols,
            &config,
            &gate,
            retain_data,
        ))
    } else {
        let screener = BatchScreener::new(fetcher, config.clone(), gate)
            .with_retained_data(retain_data);
        rt.block_on(screener.run(&sources.symbols))
    };

    // E. Background snapshot write
    let snapshot_write = if retain_data {
        let loaded = report.take_loaded_data();
        Some(rt.spawn(write_snapshot_async(
            config.persistence.cache_path(),
            loaded,
            config.persistence.cache_version,
        )))
    } else {
        None
    };

    // F. Output
    let summary = report.summary();
    log::info!(
        "{} opportunities ({} direct, {} confirmation), avg R:R {:.2}, avg confluence {:.2}",
        summary.total_opportunities,
        summary.model1_count,
        summary.model2_count,
        summary.avg_risk_reward,
        summary.avg_confluence
    );
    write_json(
        &ScreeningOutput {
            summary: &summary,
            opportunities: &report.opportunities,
        },
        args.output.as_deref(),
    )?;

    if let Some(handle) = snapshot_write {
        match rt.block_on(handle) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::error!("Failed to write snapshot: {:#}", e),
            Err(e) => log::error!("Snapshot task failed: {}", e),
        }
    }
    Ok(())
}

/// Gate from the index symbol, open when none is configured or it cannot be loaded.
async fn market_gate(fetcher: &Fetcher, args: &Cli, config: &ScreenerConfig) -> MarketGate {
    let Some(index) = &args.index_symbol else {
        return MarketGate::OPEN;
    };
    match fetcher.fetch(index).await {
        Ok(data) => MarketGate::from_index(data.daily(), &config.trading.risk),
        Err(e) => {
            log::warn!("Index {} unavailable ({:#}), allowing trades by default", index, e);
            MarketGate::OPEN
        }
    }
}

fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize results")?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Results written to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json).context("Failed to write results to stdout")?;
        }
    }
    Ok(())
}
