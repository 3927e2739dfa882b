//! Trendlines fitted through pairs of same-type pivots and scored by wick touches.

use itertools::Itertools;

#[cfg(debug_assertions)]
use crate::config::DEBUG_FLAGS;
use crate::analysis::pivots::{pivot_highs, pivot_lows};
use crate::config::TrendlineSettings;
use crate::domain::Series;
use crate::models::{Anchor, LineKind, Trendline};

/// Number of bars whose high or low lies within `tolerance` of the line, measured
/// relative to the line value. Bars where the line is at or below zero never count.
pub fn count_touches(series: &Series, line: &Trendline, tolerance: f64) -> usize {
    (0..series.len())
        .filter(|&idx| {
            let value = line.value_at(idx);
            if !(value > 0.0) {
                return false;
            }
            let high_diff = (series.high_prices[idx] - value).abs() / value;
            let low_diff = (series.low_prices[idx] - value).abs() / value;
            high_diff.min(low_diff) <= tolerance
        })
        .count()
}

/// Every line through two pivots of the same kind, before touch filtering.
/// Resistance candidates come first, pairs in index order.
fn candidate_lines(series: &Series, order: usize) -> Vec<Trendline> {
    let last_index = series.len() - 1;
    let anchors = |indices: Vec<usize>, prices: &[f64]| -> Vec<Anchor> {
        indices
            .into_iter()
            .map(|index| Anchor {
                index,
                price: prices[index],
            })
            .collect()
    };

    let highs = anchors(pivot_highs(&series.high_prices, order), &series.high_prices);
    let lows = anchors(pivot_lows(&series.low_prices, order), &series.low_prices);

    [(LineKind::Resistance, highs), (LineKind::Support, lows)]
        .into_iter()
        .flat_map(|(kind, points)| {
            points
                .into_iter()
                .tuple_combinations()
                .filter_map(move |(a, b)| Trendline::through(kind, a, b, last_index))
        })
        .collect()
}

/// Detect trendlines, strongest first. Empty below `min_bars`.
pub fn detect_trendlines(series: &Series, settings: &TrendlineSettings) -> Vec<Trendline> {
    if series.len() < settings.min_bars.max(1) {
        return Vec::new();
    }

    let mut lines: Vec<Trendline> = candidate_lines(series, settings.pivot_order)
        .into_iter()
        .filter_map(|mut line| {
            let touches = count_touches(series, &line, settings.touch_tolerance);
            if touches < settings.min_touches {
                return None;
            }
            line.touches = touches;
            line.strength = (touches as f64 / settings.full_strength_touches).min(1.0);
            Some(line)
        })
        .collect();

    // Stable: equal strengths keep candidate order
    lines.sort_by(|a, b| b.strength.total_cmp(&a.strength));

    #[cfg(debug_assertions)]
    if DEBUG_FLAGS.print_trendlines {
        for line in &lines {
            log::info!(
                "[trendlines] {} {} level {:.2} touches {} strength {:.2}",
                line.kind,
                line.direction,
                line.current_level,
                line.touches,
                line.strength
            );
        }
    }

    lines
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{Bar, DAILY};
    use crate::models::TrendDirection;

    /// Zig-zag around a rising base: peaks every 6 bars, troughs in between.
    pub(crate) fn rising_zigzag(n: usize) -> Series {
        let bars: Vec<Bar> = (0..n)
            .map(|i| {
                let base = 100.0 + i as f64 * 0.5;
                let phase = (i % 6) as f64;
                let swing = if phase <= 3.0 { phase } else { 6.0 - phase };
                let mid = base + swing * 2.0;
                Bar::new(i as i64 * 86_400_000, mid - 0.2, mid + 1.0, mid - 1.0, mid + 0.2, 1000.0)
            })
            .collect();
        Series::from_bars(DAILY, &bars).unwrap()
    }

    fn flat(n: usize) -> Series {
        let bars: Vec<Bar> = (0..n)
            .map(|i| Bar::new(i as i64, 50.0, 50.0, 50.0, 50.0, 10.0))
            .collect();
        Series::from_bars(DAILY, &bars).unwrap()
    }

    #[test]
    fn flat_series_yields_no_trendlines() {
        let lines = detect_trendlines(&flat(60), &TrendlineSettings::default());
        assert!(lines.is_empty(), "plateaus produce no pivots, so no lines");
    }

    #[test]
    fn short_series_yields_no_trendlines() {
        let series = rising_zigzag(19);
        assert!(detect_trendlines(&series, &TrendlineSettings::default()).is_empty());
    }

    #[test]
    fn rising_zigzag_produces_bullish_lines_sorted_by_strength() {
        let series = rising_zigzag(60);
        let lines = detect_trendlines(&series, &TrendlineSettings::default());

        assert!(!lines.is_empty());
        assert!(lines.windows(2).all(|w| w[0].strength >= w[1].strength));
        assert!(lines.iter().all(|l| l.touches >= 2 && l.strength <= 1.0));
        assert!(
            lines
                .iter()
                .any(|l| l.kind == LineKind::Resistance && l.direction == TrendDirection::Bullish)
        );
    }

    fn from_highs_lows(highs: &[f64], lows: &[f64]) -> Series {
        let bars: Vec<Bar> = highs
            .iter()
            .zip(lows)
            .enumerate()
            .map(|(i, (&h, &l))| Bar::new(i as i64, l, h, l, h, 10.0))
            .collect();
        Series::from_bars(DAILY, &bars).unwrap()
    }

    #[test]
    fn lowered_min_bars_admits_short_series() {
        let settings = TrendlineSettings {
            min_bars: 3,
            pivot_order: 1,
            min_touches: 0,
            ..Default::default()
        };

        // A 3-bar V has a single trough and no peak, so no pair can anchor a line
        let v = from_highs_lows(&[12.0, 10.0, 12.0], &[11.0, 9.0, 11.0]);
        assert!(pivot_highs(&v.high_prices, 1).is_empty());
        assert_eq!(pivot_lows(&v.low_prices, 1), vec![1]);
        assert!(detect_trendlines(&v, &settings).is_empty());

        // Two peaks over flat lows: exactly one resistance pair, zero support pivots
        let twin_peaks = from_highs_lows(&[10.0, 12.0, 10.0, 12.0, 10.0], &[9.0; 5]);
        assert!(pivot_lows(&twin_peaks.low_prices, 1).is_empty());
        let lines = detect_trendlines(&twin_peaks, &settings);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].kind, LineKind::Resistance);
        assert_eq!((lines[0].start.index, lines[0].end.index), (1, 3));
        assert_eq!(lines[0].touches, 2);

        // Default min_bars still rejects the same series
        assert!(detect_trendlines(&twin_peaks, &TrendlineSettings::default()).is_empty());
    }

    #[test]
    fn touches_never_decrease_with_wider_tolerance() {
        let series = rising_zigzag(60);
        let settings = TrendlineSettings {
            min_touches: 0,
            ..Default::default()
        };
        for line in detect_trendlines(&series, &settings).iter().take(10) {
            let mut prev = 0;
            for tol in [0.0, 0.001, 0.005, 0.01, 0.05, 0.2] {
                let touches = count_touches(&series, line, tol);
                assert!(touches >= prev, "touch count fell as tolerance widened");
                prev = touches;
            }
        }
    }

    #[test]
    fn non_positive_line_values_never_touch() {
        let series = flat(30);
        let line = Trendline::through(
            LineKind::Support,
            Anchor { index: 0, price: 0.0 },
            Anchor { index: 1, price: -1.0 },
            29,
        )
        .unwrap();
        assert_eq!(count_touches(&series, &line, 10.0), 0);
    }
}
