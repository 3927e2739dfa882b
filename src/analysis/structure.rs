//! Trend detection, swing points, pullbacks and structure quality.

use crate::analysis::pivots::{pivot_highs, pivot_lows};
use crate::config::StructureSettings;
use crate::domain::Series;
use crate::models::{
    PriceStructure, Pullback, StructureQuality, SwingKind, SwingPoint, Trend, VolumeTrend,
};
use crate::utils::maths_utils::{mean, regression_slope, sample_std_dev};

/// Trend from the regression slopes of highs and lows over the trailing `window`
/// bars: bullish if both rise, bearish if both fall, sideways otherwise or when the
/// series is shorter than the window.
pub fn detect_trend(series: &Series, window: usize) -> Trend {
    if window == 0 || series.len() < window {
        return Trend::Sideways;
    }
    let start = series.tail_start(window);
    let high_slope = regression_slope(&series.high_prices[start..]);
    let low_slope = regression_slope(&series.low_prices[start..]);

    if high_slope > 0.0 && low_slope > 0.0 {
        Trend::Bullish
    } else if high_slope < 0.0 && low_slope < 0.0 {
        Trend::Bearish
    } else {
        Trend::Sideways
    }
}

fn swing_points(series: &Series, order: usize) -> (Vec<SwingPoint>, Vec<SwingPoint>) {
    let point = |index: usize, price: f64, kind: SwingKind| SwingPoint {
        index,
        timestamp_ms: series.timestamps_ms[index],
        price,
        kind,
    };
    let highs = pivot_highs(&series.high_prices, order)
        .into_iter()
        .map(|i| point(i, series.high_prices[i], SwingKind::High))
        .collect();
    let lows = pivot_lows(&series.low_prices, order)
        .into_iter()
        .map(|i| point(i, series.low_prices[i], SwingKind::Low))
        .collect();
    (highs, lows)
}

/// Scan consecutive swing triples in time order for continuation pullbacks.
fn find_pullbacks(highs: &[SwingPoint], lows: &[SwingPoint]) -> Vec<Pullback> {
    let mut swings: Vec<SwingPoint> = highs.iter().chain(lows).copied().collect();
    // Stable: a bar that is both a swing high and low keeps the high first
    swings.sort_by_key(|s| s.index);

    swings
        .windows(3)
        .filter_map(|w| {
            let (first, middle, last) = (w[0], w[1], w[2]);
            match (first.kind, middle.kind, last.kind) {
                (SwingKind::High, SwingKind::Low, SwingKind::High) if last.price > first.price => {
                    Some(Pullback {
                        trend: Trend::Bullish,
                        start: first,
                        extreme: middle,
                        continuation: last,
                        pullback_pct: (first.price - middle.price) / first.price,
                    })
                }
                (SwingKind::Low, SwingKind::High, SwingKind::Low) if last.price < first.price => {
                    Some(Pullback {
                        trend: Trend::Bearish,
                        start: first,
                        extreme: middle,
                        continuation: last,
                        pullback_pct: (middle.price - first.price) / first.price,
                    })
                }
                _ => None,
            }
        })
        .collect()
}

fn classify_quality(
    series: &Series,
    highs: &[SwingPoint],
    lows: &[SwingPoint],
    settings: &StructureSettings,
) -> StructureQuality {
    if highs.len() < 2 || lows.len() < 2 {
        return StructureQuality::InsufficientData;
    }
    let start = series.tail_start(settings.volatility_window);
    let volatility =
        sample_std_dev(&series.high_prices[start..]) / mean(&series.close_prices[start..]);

    if !volatility.is_finite() {
        StructureQuality::Error
    } else if volatility > settings.volatility_threshold {
        StructureQuality::Choppy
    } else {
        StructureQuality::Clean
    }
}

/// Classify the structure of a series. Always returns a labelled result.
pub fn identify_structure(series: &Series, settings: &StructureSettings) -> PriceStructure {
    if series.len() < settings.min_bars {
        return PriceStructure::insufficient();
    }

    let (swing_highs, swing_lows) = swing_points(series, settings.swing_order);
    let pullbacks = find_pullbacks(&swing_highs, &swing_lows);
    let quality = classify_quality(series, &swing_highs, &swing_lows, settings);

    PriceStructure {
        trend: detect_trend(series, settings.trend_window),
        swing_highs,
        swing_lows,
        pullbacks,
        quality,
    }
}

/// Increasing when the short volume average exceeds the long one. Unknown until the
/// series is longer than the long window.
pub fn volume_trend(series: &Series, settings: &StructureSettings) -> VolumeTrend {
    if series.len() <= settings.volume_slow_window {
        return VolumeTrend::Unknown;
    }
    let fast = mean(&series.volumes[series.tail_start(settings.volume_fast_window)..]);
    let slow = mean(&series.volumes[series.tail_start(settings.volume_slow_window)..]);
    if fast > slow {
        VolumeTrend::Increasing
    } else {
        VolumeTrend::Decreasing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::trendlines::tests::rising_zigzag;
    use crate::domain::{Bar, DAILY};

    fn series(bars: Vec<Bar>) -> Series {
        Series::from_bars(DAILY, &bars).unwrap()
    }

    fn trending(n: usize, step: f64) -> Series {
        series(
            (0..n)
                .map(|i| {
                    let c = 100.0 + step * i as f64;
                    Bar::new(i as i64, c, c + 1.0, c - 1.0, c, 100.0)
                })
                .collect(),
        )
    }

    #[test]
    fn trend_follows_regression_slopes() {
        assert_eq!(detect_trend(&trending(30, 1.0), 20), Trend::Bullish);
        assert_eq!(detect_trend(&trending(30, -1.0), 20), Trend::Bearish);
        assert_eq!(detect_trend(&trending(30, 0.0), 20), Trend::Sideways);
        assert_eq!(detect_trend(&trending(10, 1.0), 20), Trend::Sideways, "too short");
    }

    #[test]
    fn flat_series_is_insufficient_not_an_error() {
        let flat = series((0..40).map(|i| Bar::new(i, 5.0, 5.0, 5.0, 5.0, 1.0)).collect());
        let structure = identify_structure(&flat, &StructureSettings::default());
        assert_eq!(structure.quality, StructureQuality::InsufficientData);
        assert!(structure.swing_highs.is_empty());

        let short = identify_structure(&trending(19, 1.0), &StructureSettings::default());
        assert_eq!(short.quality, StructureQuality::InsufficientData);
        assert_eq!(short.trend, Trend::Sideways);
    }

    #[test]
    fn zigzag_has_swings_and_bullish_pullbacks() {
        let structure = identify_structure(&rising_zigzag(60), &StructureSettings::default());

        assert!(structure.swing_highs.len() >= 2);
        assert!(structure.swing_lows.len() >= 2);
        assert_eq!(structure.trend, Trend::Bullish);
        assert!(!structure.pullbacks.is_empty());
        for pullback in &structure.pullbacks {
            assert_eq!(pullback.trend, Trend::Bullish);
            assert!(pullback.pullback_pct > 0.0);
            assert!(pullback.continuation.price > pullback.start.price);
        }
        assert_eq!(structure.quality, StructureQuality::Clean);
    }

    #[test]
    fn wide_highs_are_choppy() {
        let settings = StructureSettings {
            volatility_threshold: 0.001,
            ..Default::default()
        };
        let structure = identify_structure(&rising_zigzag(60), &settings);
        assert_eq!(structure.quality, StructureQuality::Choppy);
    }

    #[test]
    fn volume_trend_compares_short_and_long_means() {
        let settings = StructureSettings::default();
        let mut bars: Vec<Bar> = (0..30).map(|i| Bar::new(i, 1.0, 1.0, 1.0, 1.0, 100.0)).collect();
        assert_eq!(volume_trend(&series(bars.clone()), &settings), VolumeTrend::Decreasing);

        for bar in bars.iter_mut().skip(25) {
            bar.volume = 500.0;
        }
        assert_eq!(volume_trend(&series(bars.clone()), &settings), VolumeTrend::Increasing);

        bars.truncate(20);
        assert_eq!(volume_trend(&series(bars), &settings), VolumeTrend::Unknown);
    }
}
