//! Per-symbol pipeline: engines, zones, entry models and filters over one snapshot.

use std::fmt;

use serde::Serialize;

use crate::analysis::entry_models::EntryModelDetector;
use crate::analysis::liquidity::{LiquidityZoneScorer, TechnicalSnapshot};
use crate::analysis::screening::{MarketGate, pre_screen, validate_opportunity};
use crate::config::ScreenerConfig;
use crate::domain::MarketData;
use crate::models::{StructureQuality, TradingOpportunity, Trend};
use crate::utils::time_utils::epoch_ms_to_utc;

/// Why a symbol produced no screened opportunities before entry detection ran.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenSkip {
    NoData,
    Filtered(String),
}

impl fmt::Display for ScreenSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenSkip::NoData => write!(f, "no usable data"),
            ScreenSkip::Filtered(reason) => write!(f, "filtered: {}", reason),
        }
    }
}

/// Diagnostic view of one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolAnalysis {
    pub symbol: String,
    pub current_price: Option<f64>,
    pub timeframes: Vec<String>,
    /// Daily coverage, UTC
    pub first_bar: Option<String>,
    pub last_bar: Option<String>,
    pub passes_pre_screen: bool,
    pub pre_screen_reason: Option<String>,
    pub trend: Trend,
    pub structure_quality: StructureQuality,
    pub trendline_count: usize,
    pub level_count: usize,
    pub zone_count: usize,
    /// Every detected opportunity, best first.
    pub opportunities: Vec<TradingOpportunity>,
    /// Validation failure per opportunity, None when it passed.
    pub validation: Vec<Option<String>>,
}

struct PipelineOutput {
    snapshot: TechnicalSnapshot,
    zone_count: usize,
    opportunities: Vec<TradingOpportunity>,
}

fn run_pipeline(data: &MarketData, config: &ScreenerConfig) -> Option<PipelineOutput> {
    let daily = data.daily()?;
    let snapshot = TechnicalSnapshot::compute(daily, &config.analysis)?;

    let zones = if daily.len() >= config.analysis.zones.min_daily_bars {
        LiquidityZoneScorer::new(&config.analysis.zones).score_zones(&snapshot, daily)
    } else {
        Vec::new()
    };

    let detector = EntryModelDetector::new(&config.analysis, &config.trading.entry);
    let opportunities = if zones.is_empty() {
        Vec::new()
    } else {
        let ctx = detector.build_context(data, daily, &snapshot);
        detector.detect_opportunities(&ctx, &zones)
    };

    Some(PipelineOutput {
        zone_count: zones.len(),
        snapshot,
        opportunities,
    })
}

/// Detailed single-symbol report. Never fails: missing data shows up as empty counts
/// and an insufficient-data structure.
pub fn analyze_symbol(data: &MarketData, config: &ScreenerConfig, gate: &MarketGate) -> SymbolAnalysis {
    let pre_screen_result = match data.daily() {
        Some(daily) => pre_screen(daily, &config.trading.pre_screen).map_err(|e| e.to_string()),
        None => Err("no daily data".to_string()),
    };

    let mut analysis = SymbolAnalysis {
        symbol: data.symbol.clone(),
        current_price: data.current_price(),
        timeframes: data.valid_timeframes().map(|(name, _)| name.clone()).collect(),
        first_bar: data
            .daily()
            .and_then(|d| d.first_timestamp_ms())
            .map(epoch_ms_to_utc),
        last_bar: data
            .daily()
            .and_then(|d| d.last_timestamp_ms())
            .map(epoch_ms_to_utc),
        passes_pre_screen: pre_screen_result.is_ok(),
        pre_screen_reason: pre_screen_result.err(),
        trend: Trend::Sideways,
        structure_quality: StructureQuality::InsufficientData,
        trendline_count: 0,
        level_count: 0,
        zone_count: 0,
        opportunities: Vec::new(),
        validation: Vec::new(),
    };

    if let Some(output) = run_pipeline(data, config) {
        analysis.trend = output.snapshot.structure.trend;
        analysis.structure_quality = output.snapshot.structure.quality;
        analysis.trendline_count = output.snapshot.trendlines.len();
        analysis.level_count = output.snapshot.levels.len();
        analysis.zone_count = output.zone_count;
        analysis.validation = output
            .opportunities
            .iter()
            .map(|opp| validate_opportunity(opp, &config.trading.risk, gate).err().map(|e| e.to_string()))
            .collect();
        analysis.opportunities = output.opportunities;
    }

    log::info!(
        "{}: {} trendlines, {} levels, {} zones, {} opportunities",
        analysis.symbol,
        analysis.trendline_count,
        analysis.level_count,
        analysis.zone_count,
        analysis.opportunities.len()
    );
    analysis
}

/// Batch screening of one symbol: pre-screen, detect, then keep only opportunities
/// passing validation. Filters are skipped when `engine.apply_filters` is off.
pub fn screen_symbol(
    data: &MarketData,
    config: &ScreenerConfig,
    gate: &MarketGate,
) -> Result<Vec<TradingOpportunity>, ScreenSkip> {
    if !data.is_valid() {
        return Err(ScreenSkip::NoData);
    }
    let apply_filters = config.engine.apply_filters;

    if apply_filters {
        let daily = data.daily().ok_or(ScreenSkip::NoData)?;
        pre_screen(daily, &config.trading.pre_screen)
            .map_err(|e| ScreenSkip::Filtered(e.to_string()))?;
    }

    let Some(output) = run_pipeline(data, config) else {
        return Ok(Vec::new());
    };

    if !apply_filters {
        return Ok(output.opportunities);
    }
    Ok(output
        .opportunities
        .into_iter()
        .filter(|opp| match validate_opportunity(opp, &config.trading.risk, gate) {
            Ok(()) => true,
            Err(reason) => {
                log::debug!("{}: {} dropped: {}", opp.symbol, opp.entry_model, reason);
                false
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, DAILY, Series};

    fn flat_symbol(n: usize) -> MarketData {
        let bars: Vec<Bar> = (0..n)
            .map(|i| Bar::new(i as i64, 100.0, 100.0, 100.0, 100.0, 100_000.0))
            .collect();
        MarketData::new("FLAT").with_series(Series::from_bars(DAILY, &bars).unwrap())
    }

    #[test]
    fn flat_series_reports_without_crashing() {
        let config = ScreenerConfig::default();
        let analysis = analyze_symbol(&flat_symbol(80), &config, &MarketGate::OPEN);

        assert_eq!(analysis.current_price, Some(100.0));
        assert_eq!(analysis.first_bar.as_deref(), Some("1970-01-01 00:00"));
        assert_eq!(analysis.trendline_count, 0);
        assert_eq!(analysis.structure_quality, StructureQuality::InsufficientData);
        assert!(analysis.passes_pre_screen);
        assert_eq!(analysis.opportunities.len(), analysis.validation.len());
    }

    #[test]
    fn missing_daily_data_is_a_report_not_an_error() {
        let config = ScreenerConfig::default();
        let analysis = analyze_symbol(&MarketData::new("NONE"), &config, &MarketGate::OPEN);

        assert!(!analysis.passes_pre_screen);
        assert_eq!(analysis.pre_screen_reason.as_deref(), Some("no daily data"));
        assert!(analysis.opportunities.is_empty());
    }

    #[test]
    fn screen_symbol_skips_invalid_and_filtered() {
        let config = ScreenerConfig::default();
        assert_eq!(
            screen_symbol(&MarketData::new("NONE"), &config, &MarketGate::OPEN),
            Err(ScreenSkip::NoData)
        );
        assert!(matches!(
            screen_symbol(&flat_symbol(10), &config, &MarketGate::OPEN),
            Err(ScreenSkip::Filtered(_))
        ));

        let mut unfiltered = ScreenerConfig::default();
        unfiltered.engine.apply_filters = false;
        assert_eq!(
            screen_symbol(&flat_symbol(10), &unfiltered, &MarketGate::OPEN),
            Ok(Vec::new())
        );
    }
}
