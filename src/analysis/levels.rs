//! Support/resistance levels from four generators, consolidated into ranked levels.

#[cfg(debug_assertions)]
use crate::config::DEBUG_FLAGS;
use crate::analysis::pivots::{pivot_highs, pivot_lows};
use crate::config::LevelSettings;
use crate::domain::Series;
use crate::models::{Level, LevelSource, LineKind};
use crate::utils::maths_utils::{get_max, get_min, quantile, relative_distance};

/// Order-2 pivot highs and lows over the lookback window.
fn pivot_levels(recent: &Series, settings: &LevelSettings) -> Vec<Level> {
    let highs = pivot_highs(&recent.high_prices, settings.pivot_order)
        .into_iter()
        .map(|i| Level::new(recent.high_prices[i], LineKind::Resistance, 1, LevelSource::PivotHigh));
    let lows = pivot_lows(&recent.low_prices, settings.pivot_order)
        .into_iter()
        .map(|i| Level::new(recent.low_prices[i], LineKind::Support, 1, LevelSource::PivotLow));
    highs.chain(lows).collect()
}

/// Highs and lows of bars whose volume is strictly above the configured quantile.
fn volume_levels(recent: &Series, settings: &LevelSettings) -> Vec<Level> {
    let Some(threshold) = quantile(&recent.volumes, settings.volume_quantile) else {
        return Vec::new();
    };
    (0..recent.len())
        .filter(|&i| recent.volumes[i] > threshold)
        .flat_map(|i| {
            [
                Level::new(recent.high_prices[i], LineKind::Resistance, 1, LevelSource::HighVolume),
                Level::new(recent.low_prices[i], LineKind::Support, 1, LevelSource::HighVolume),
            ]
        })
        .collect()
}

/// Round numbers within the configured band around the current price.
fn psychological_levels(current_price: f64, settings: &LevelSettings) -> Vec<Level> {
    let lower = current_price * (1.0 - settings.psychological_range);
    let upper = current_price * (1.0 + settings.psychological_range);

    let mut levels = Vec::new();
    for &base in &settings.psychological_bases {
        for multiplier in 1..=settings.psychological_max_multiplier {
            let price = base * multiplier as f64;
            if (lower..=upper).contains(&price) {
                let kind = if price > current_price {
                    LineKind::Resistance
                } else {
                    LineKind::Support
                };
                levels.push(Level::new(price, kind, 1, LevelSource::Psychological));
            }
        }
    }
    levels
}

/// All-time extremes (strength 3) and trailing-year extremes (strength 2).
fn historical_levels(series: &Series, settings: &LevelSettings) -> Vec<Level> {
    let mut levels = Vec::with_capacity(4);
    if let (Some(ath), Some(atl)) = (get_max(&series.high_prices), get_min(&series.low_prices)) {
        levels.push(Level::new(ath, LineKind::Resistance, 3, LevelSource::AllTimeHigh));
        levels.push(Level::new(atl, LineKind::Support, 3, LevelSource::AllTimeLow));
    }

    let start = series.tail_start(settings.year_lookback);
    if let (Some(high), Some(low)) = (
        get_max(&series.high_prices[start..]),
        get_min(&series.low_prices[start..]),
    ) {
        levels.push(Level::new(high, LineKind::Resistance, 2, LevelSource::YearHigh));
        levels.push(Level::new(low, LineKind::Support, 2, LevelSource::YearLow));
    }
    levels
}

/// Merge raw levels that sit within `tolerance` of the previous consolidated level
/// (scanning in price order), then rank by strength x touches. Both sorts are stable.
pub fn consolidate_levels(mut raw: Vec<Level>, tolerance: f64) -> Vec<Level> {
    raw.sort_by(|a, b| a.price.total_cmp(&b.price));

    let mut consolidated: Vec<Level> = Vec::with_capacity(raw.len());
    for level in raw {
        match consolidated.last_mut() {
            Some(last)
                if relative_distance(level.price, last.price)
                    .is_some_and(|distance| distance <= tolerance) =>
            {
                last.absorb(level)
            }
            _ => consolidated.push(level),
        }
    }

    consolidated.sort_by(|a, b| b.weight().total_cmp(&a.weight()));
    consolidated
}

/// Consolidated support/resistance levels for a series, strongest first. Empty when
/// the series is shorter than the lookback window.
pub fn find_levels(series: &Series, settings: &LevelSettings) -> Vec<Level> {
    if series.is_empty() || series.len() < settings.lookback {
        return Vec::new();
    }
    let Some(current_price) = series.last_close() else {
        return Vec::new();
    };

    let recent = series.tail(settings.lookback);
    let mut raw = pivot_levels(&recent, settings);
    raw.extend(volume_levels(&recent, settings));
    raw.extend(psychological_levels(current_price, settings));
    raw.extend(historical_levels(series, settings));

    let levels = consolidate_levels(raw, settings.consolidation_tolerance);

    #[cfg(debug_assertions)]
    if DEBUG_FLAGS.print_levels {
        for level in &levels {
            log::info!(
                "[levels] {} {:.2} strength {} touches {} sources {:?}",
                level.kind,
                level.price,
                level.strength,
                level.touches,
                level.sources
            );
        }
    }

    levels
}
