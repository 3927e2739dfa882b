//! Fibonacci retracements anchored on an auto-detected swing.

use crate::analysis::structure::detect_trend;
use crate::config::FibonacciSettings;
use crate::domain::Series;
use crate::models::{FibLevel, FibonacciSet, Trend};
use crate::utils::maths_utils::{argmax, argmin};

/// Retracement levels for the series, or None below `min_bars`.
///
/// Bullish: lowest low in the swing window, then the highest high from that bar on;
/// levels hang down from the high. Bearish and sideways both anchor on the highest
/// high in the window, then the lowest low after it; levels rise from the low.
/// Sideways deliberately shares the bearish branch.
pub fn calculate_fibonacci(series: &Series, settings: &FibonacciSettings) -> Option<FibonacciSet> {
    if series.is_empty() || series.len() < settings.min_bars {
        return None;
    }

    let trend = detect_trend(series, settings.trend_window);
    let start = series.tail_start(settings.swing_lookback);
    let highs = &series.high_prices;
    let lows = &series.low_prices;

    let (high_idx, low_idx) = match trend {
        Trend::Bullish => {
            let low_idx = start + argmin(&lows[start..])?;
            let high_idx = low_idx + argmax(&highs[low_idx..])?;
            (high_idx, low_idx)
        }
        Trend::Bearish | Trend::Sideways => {
            let high_idx = start + argmax(&highs[start..])?;
            let low_idx = high_idx + argmin(&lows[high_idx..])?;
            (high_idx, low_idx)
        }
    };

    let swing_high = highs[high_idx];
    let swing_low = lows[low_idx];
    let range = swing_high - swing_low;

    let levels = settings
        .ratios
        .iter()
        .map(|&ratio| FibLevel {
            ratio,
            label: FibLevel::label_for(ratio),
            price: match trend {
                Trend::Bullish => swing_high - range * ratio,
                Trend::Bearish | Trend::Sideways => swing_low + range * ratio,
            },
        })
        .collect();

    Some(FibonacciSet {
        trend,
        swing_high,
        swing_high_index: high_idx,
        swing_low,
        swing_low_index: low_idx,
        levels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, DAILY};

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn trending(n: usize, step: f64) -> Series {
        let bars: Vec<Bar> = (0..n)
            .map(|i| {
                let c = 200.0 + step * i as f64;
                Bar::new(i as i64, c, c + 2.0, c - 2.0, c, 100.0)
            })
            .collect();
        Series::from_bars(DAILY, &bars).unwrap()
    }

    fn with_ratios(ratios: &[f64]) -> FibonacciSettings {
        FibonacciSettings {
            ratios: ratios.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn bullish_ratio_endpoints_map_to_swing_extremes() {
        let series = trending(60, 1.0);
        let fib = calculate_fibonacci(&series, &with_ratios(&[0.0, 0.5, 1.0])).unwrap();

        assert_eq!(fib.trend, Trend::Bullish);
        // Low of bar 10 (first bar of the 50-bar window), high of the last bar
        assert_eq!(fib.swing_low_index, 10);
        assert_eq!(fib.swing_high_index, 59);
        assert!(approx_eq(fib.levels[0].price, fib.swing_high), "ratio 0 is the high");
        assert!(approx_eq(fib.levels[2].price, fib.swing_low), "ratio 1 is the low");
        assert!(approx_eq(fib.levels[1].price, (fib.swing_high + fib.swing_low) / 2.0));
    }

    #[test]
    fn bearish_ratio_endpoints_map_to_swing_extremes() {
        let series = trending(60, -1.0);
        let fib = calculate_fibonacci(&series, &with_ratios(&[0.0, 1.0])).unwrap();

        assert_eq!(fib.trend, Trend::Bearish);
        assert!(approx_eq(fib.levels[0].price, fib.swing_low), "ratio 0 is the low");
        assert!(approx_eq(fib.levels[1].price, fib.swing_high), "ratio 1 is the high");
    }

    #[test]
    fn sideways_uses_bearish_anchoring() {
        let series = trending(60, 0.0);
        let fib = calculate_fibonacci(&series, &with_ratios(&[0.0])).unwrap();

        assert_eq!(fib.trend, Trend::Sideways);
        assert!(fib.swing_low_index >= fib.swing_high_index);
        assert!(approx_eq(fib.levels[0].price, fib.swing_low));
    }

    #[test]
    fn default_labels_and_short_series() {
        let fib = calculate_fibonacci(&trending(30, 1.0), &FibonacciSettings::default()).unwrap();
        let labels: Vec<&str> = fib.levels.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, ["fib_23.6", "fib_38.2", "fib_50.0", "fib_61.8", "fib_78.6"]);

        assert!(calculate_fibonacci(&trending(19, 1.0), &FibonacciSettings::default()).is_none());
    }
}
