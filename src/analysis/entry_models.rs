//! Entry model state machines evaluated against liquidity zones.
//!
//! Model 1 (direct entry) fires when price sits near a zone that agrees with the
//! daily trend. Model 2 (confirmation entry) additionally needs a recently broken
//! hourly trendline, a retest of the zone with a rejection wick, and a broken line
//! whose direction opposes the new trade.

use std::collections::BTreeMap;

#[cfg(debug_assertions)]
use crate::config::DEBUG_FLAGS;
use crate::analysis::liquidity::{LiquidityZoneScorer, TechnicalSnapshot};
use crate::analysis::structure::{detect_trend, identify_structure, volume_trend};
use crate::analysis::trendlines::detect_trendlines;
use crate::config::{AnalysisConfig, EntrySettings};
use crate::domain::{MarketData, Series};
use crate::models::{
    Confirmation, Direction, EntryModel, Level, LineKind, LiquidityZone, RiskReward,
    TimeframeSummary, TradingOpportunity, Trend, TrendDirection, Trendline,
};
use crate::utils::maths_utils::{get_max, get_min, relative_distance};
use crate::utils::time_utils::local_now_as_timestamp_ms;

/// Whether `line` was pierced by more than `buffer` within the last `lookback` bars of
/// `window`. Indices are those of the window the line was fitted on.
pub fn is_recently_broken(window: &Series, line: &Trendline, lookback: usize, buffer: f64) -> bool {
    if lookback == 0 || window.len() < lookback {
        return false;
    }
    (window.len() - lookback..window.len()).any(|idx| {
        let value = line.value_at(idx);
        match line.kind {
            LineKind::Support => window.low_prices[idx] < value * (1.0 - buffer),
            LineKind::Resistance => window.high_prices[idx] > value * (1.0 + buffer),
        }
    })
}

/// A lower wick (support) or upper wick (resistance) at least `ratio` times the body
/// in one of the last `lookback` bars. Zero-length wicks never count.
pub fn has_rejection_wick(window: &Series, kind: LineKind, lookback: usize, ratio: f64) -> bool {
    let start = window.tail_start(lookback);
    (start..window.len()).any(|idx| {
        let bar = window.bar(idx);
        let wick = match kind {
            LineKind::Support => bar.lower_wick(),
            LineKind::Resistance => bar.upper_wick(),
        };
        wick > 0.0 && wick >= bar.body_size() * ratio
    })
}

/// Everything the entry models need about a symbol that does not depend on the zone.
#[derive(Debug, Clone)]
pub struct SymbolContext<'a> {
    pub symbol: &'a str,
    pub current_price: f64,
    pub daily: &'a Series,
    /// Daily consolidated levels, used for targets.
    pub levels: &'a [Level],
    /// Trailing hourly window, when hourly data exists.
    pub hourly_window: Option<Series>,
    /// First trendline (strength order) on the hourly window broken in its last bars.
    pub broken_trendline: Option<Trendline>,
    pub timeframe_analysis: BTreeMap<String, TimeframeSummary>,
    pub created_at_ms: i64,
}

pub struct EntryModelDetector<'a> {
    analysis: &'a AnalysisConfig,
    entry: &'a EntrySettings,
}

impl<'a> EntryModelDetector<'a> {
    pub fn new(analysis: &'a AnalysisConfig, entry: &'a EntrySettings) -> Self {
        Self { analysis, entry }
    }

    /// Trend, structure quality, price and volume trend for every non-empty timeframe.
    pub fn timeframe_summary(&self, data: &MarketData) -> BTreeMap<String, TimeframeSummary> {
        let structure = &self.analysis.structure;
        data.valid_timeframes()
            .map(|(name, series)| {
                (
                    name.clone(),
                    TimeframeSummary {
                        trend: detect_trend(series, structure.trend_window),
                        structure_quality: identify_structure(series, structure).quality,
                        current_price: series.last_close(),
                        volume_trend: volume_trend(series, structure),
                    },
                )
            })
            .collect()
    }

    pub fn build_context<'d>(
        &self,
        data: &'d MarketData,
        daily: &'d Series,
        snapshot: &'d TechnicalSnapshot,
    ) -> SymbolContext<'d> {
        let hourly_window = data.hourly().map(|h| h.tail(self.entry.hourly_window));
        let broken_trendline = hourly_window.as_ref().and_then(|window| {
            detect_trendlines(window, &self.analysis.trendlines)
                .into_iter()
                .find(|line| {
                    is_recently_broken(
                        window,
                        line,
                        self.entry.break_lookback,
                        self.entry.break_buffer,
                    )
                })
        });

        SymbolContext {
            symbol: &data.symbol,
            current_price: snapshot.current_price,
            daily,
            levels: &snapshot.levels,
            hourly_window,
            broken_trendline,
            timeframe_analysis: self.timeframe_summary(data),
            created_at_ms: local_now_as_timestamp_ms(),
        }
    }

    /// Closest level beyond the entry by more than the target buffer, else a fixed move.
    fn find_target(&self, ctx: &SymbolContext, direction: Direction, entry: f64) -> f64 {
        let e = self.entry;
        match direction {
            Direction::Long => ctx
                .levels
                .iter()
                .filter(|l| l.kind == LineKind::Resistance && l.price > entry * (1.0 + e.target_buffer))
                .map(|l| l.price)
                .min_by(f64::total_cmp)
                .unwrap_or(entry * (1.0 + e.fallback_target_pct)),
            Direction::Short => ctx
                .levels
                .iter()
                .filter(|l| l.kind == LineKind::Support && l.price < entry * (1.0 - e.target_buffer))
                .map(|l| l.price)
                .max_by(f64::total_cmp)
                .unwrap_or(entry * (1.0 - e.fallback_target_pct)),
        }
    }

    /// Tightest stop among the zone, the zone's same-side trendlines and the recent
    /// swing extreme: the highest floor for longs, the lowest ceiling for shorts.
    fn find_stop(&self, ctx: &SymbolContext, zone: &LiquidityZone, direction: Direction) -> f64 {
        let e = self.entry;
        let swing_start = ctx.daily.tail_start(e.swing_window);
        match direction {
            Direction::Long => {
                let mut stop = zone.price * (1.0 - e.zone_stop_buffer);
                for line in zone.trendlines.iter().filter(|l| l.kind == LineKind::Support) {
                    stop = stop.max(line.current_level * (1.0 - e.trendline_stop_buffer));
                }
                if let Some(low) = get_min(&ctx.daily.low_prices[swing_start..]) {
                    stop = stop.max(low * (1.0 - e.swing_stop_buffer));
                }
                stop
            }
            Direction::Short => {
                let mut stop = zone.price * (1.0 + e.zone_stop_buffer);
                for line in zone.trendlines.iter().filter(|l| l.kind == LineKind::Resistance) {
                    stop = stop.min(line.current_level * (1.0 + e.trendline_stop_buffer));
                }
                if let Some(high) = get_max(&ctx.daily.high_prices[swing_start..]) {
                    stop = stop.min(high * (1.0 + e.swing_stop_buffer));
                }
                stop
            }
        }
    }

    /// Entry at the zone price with derived stop and target, if the risk/reward clears
    /// the minimum.
    fn price_trade(
        &self,
        ctx: &SymbolContext,
        zone: &LiquidityZone,
        direction: Direction,
    ) -> Option<(f64, f64, f64, RiskReward)> {
        let entry = zone.price;
        let target = self.find_target(ctx, direction, entry);
        let stop = self.find_stop(ctx, zone, direction);
        let rr = RiskReward::compute(direction, entry, stop, target)?;
        if rr.ratio < self.entry.min_risk_reward {
            return None;
        }
        Some((entry, stop, target, rr))
    }

    fn within_distance(&self, ctx: &SymbolContext, zone: &LiquidityZone, tolerance: f64) -> bool {
        relative_distance(zone.price, ctx.current_price).is_some_and(|d| d <= tolerance)
    }

    /// Model 1: direct entry at a zone that agrees with the daily trend.
    pub fn check_direct_entry(
        &self,
        ctx: &SymbolContext,
        zone: &LiquidityZone,
    ) -> Option<TradingOpportunity> {
        if !self.within_distance(ctx, zone, self.entry.direct_distance_tolerance) {
            return rejected(ctx, EntryModel::DirectEntry, zone, "too far from price");
        }

        let direction = match (zone.structure.trend, zone.kind) {
            (Trend::Bullish, LineKind::Support) => Direction::Long,
            (Trend::Bearish, LineKind::Resistance) => Direction::Short,
            _ => return rejected(ctx, EntryModel::DirectEntry, zone, "no directional agreement"),
        };

        let Some((entry, stop, target, rr)) = self.price_trade(ctx, zone, direction) else {
            return rejected(ctx, EntryModel::DirectEntry, zone, "risk/reward below minimum");
        };

        Some(TradingOpportunity {
            symbol: ctx.symbol.to_string(),
            entry_model: EntryModel::DirectEntry,
            direction,
            entry_price: entry,
            stop_loss: stop,
            target,
            risk_reward_ratio: rr.ratio,
            confluence_score: zone.confluence_score,
            confirmations: zone.confirmations.clone(),
            timeframe_analysis: ctx.timeframe_analysis.clone(),
            zone: zone.clone(),
            broken_trendline: None,
            notes: format!(
                "Direct entry at {} with {} confirmations",
                zone.kind,
                zone.confirmation_count()
            ),
            created_at_ms: ctx.created_at_ms,
        })
    }

    /// Model 2: break detection, then retest confirmation, then the directional gate.
    pub fn check_confirmation_entry(
        &self,
        ctx: &SymbolContext,
        zone: &LiquidityZone,
    ) -> Option<TradingOpportunity> {
        let model = EntryModel::ConfirmationEntry;
        let Some(window) = &ctx.hourly_window else {
            return rejected(ctx, model, zone, "no hourly data");
        };
        if !self.within_distance(ctx, zone, self.entry.confirmation_distance_tolerance) {
            return rejected(ctx, model, zone, "too far from price");
        }
        let Some(broken) = &ctx.broken_trendline else {
            return rejected(ctx, model, zone, "no recently broken trendline");
        };

        // Retest: latest hourly close back at the zone with a rejection wick
        let retesting = window.last_close().is_some_and(|close| {
            relative_distance(close, zone.price)
                .is_some_and(|d| d <= self.entry.retest_distance_tolerance)
        }) && has_rejection_wick(
            window,
            zone.kind,
            self.entry.retest_lookback,
            self.entry.wick_body_ratio,
        );
        if !retesting {
            return rejected(ctx, model, zone, "no retest");
        }

        let direction = match (zone.structure.trend, zone.kind, broken.direction) {
            (Trend::Bullish, LineKind::Support, TrendDirection::Bearish) => Direction::Long,
            (Trend::Bearish, LineKind::Resistance, TrendDirection::Bullish) => Direction::Short,
            _ => return rejected(ctx, model, zone, "broken line does not oppose the trade"),
        };

        let Some((entry, stop, target, rr)) = self.price_trade(ctx, zone, direction) else {
            return rejected(ctx, model, zone, "risk/reward below minimum");
        };

        let mut confirmations = zone.confirmations.clone();
        confirmations.push(Confirmation::TrendlineBreak { kind: broken.kind });
        let notes = format!(
            "Entry after trendline break + retest with {} confirmations",
            confirmations.len()
        );

        Some(TradingOpportunity {
            symbol: ctx.symbol.to_string(),
            entry_model: model,
            direction,
            entry_price: entry,
            stop_loss: stop,
            target,
            risk_reward_ratio: rr.ratio,
            confluence_score: zone.confluence_score + self.entry.confirmation_bonus,
            confirmations,
            timeframe_analysis: ctx.timeframe_analysis.clone(),
            zone: zone.clone(),
            broken_trendline: Some(broken.clone()),
            notes,
            created_at_ms: ctx.created_at_ms,
        })
    }

    /// Both models against every zone, best confluence first. Ties keep zone order.
    pub fn detect_opportunities(
        &self,
        ctx: &SymbolContext,
        zones: &[LiquidityZone],
    ) -> Vec<TradingOpportunity> {
        let mut opportunities: Vec<TradingOpportunity> = zones
            .iter()
            .flat_map(|zone| {
                [
                    self.check_direct_entry(ctx, zone),
                    self.check_confirmation_entry(ctx, zone),
                ]
            })
            .flatten()
            .collect();

        opportunities.sort_by(|a, b| b.confluence_score.total_cmp(&a.confluence_score));
        opportunities
    }

    /// Full pipeline for one symbol: daily engines, zones, then both entry models.
    pub fn detect(&self, data: &MarketData) -> Vec<TradingOpportunity> {
        let Some(daily) = data.daily() else {
            log::warn!("{}: no daily data", data.symbol);
            return Vec::new();
        };
        if daily.len() < self.analysis.zones.min_daily_bars {
            return Vec::new();
        }
        let Some(snapshot) = TechnicalSnapshot::compute(daily, self.analysis) else {
            return Vec::new();
        };
        let zones = LiquidityZoneScorer::new(&self.analysis.zones).score_zones(&snapshot, daily);
        if zones.is_empty() {
            log::debug!("{}: no liquidity zones", data.symbol);
            return Vec::new();
        }
        let ctx = self.build_context(data, daily, &snapshot);
        self.detect_opportunities(&ctx, &zones)
    }
}

fn rejected<T>(
    ctx: &SymbolContext,
    model: EntryModel,
    zone: &LiquidityZone,
    reason: &str,
) -> Option<T> {
    #[cfg(debug_assertions)]
    if DEBUG_FLAGS.print_entry_rejections {
        log::info!(
            "[entry] {}: {} rejected {} zone at {:.2}: {}",
            ctx.symbol,
            model,
            zone.kind,
            zone.price,
            reason
        );
        return None;
    }
    log::trace!(
        "{}: {} rejected {} zone at {:.2}: {}",
        ctx.symbol,
        model,
        zone.kind,
        zone.price,
        reason
    );
    None
}
