//! Analysis and computation configuration

use serde::{Deserialize, Serialize};

/// Default Fibonacci retracement ratios
pub const DEFAULT_FIB_RATIOS: [f64; 5] = [0.236, 0.382, 0.5, 0.618, 0.786];

/// Candidate zone offsets from the current price (negative = support)
pub const ZONE_OFFSETS: [f64; 14] = [
    -0.15, -0.10, -0.08, -0.05, -0.03, -0.02, -0.01, 0.01, 0.02, 0.03, 0.05, 0.08, 0.10, 0.15,
];

/// Round-number bases for psychological levels
pub const PSYCHOLOGICAL_BASES: [f64; 5] = [10.0, 50.0, 100.0, 500.0, 1000.0];

/// Settings for trendline detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendlineSettings {
    // Pivot order used to pick trendline anchors
    pub pivot_order: usize,
    // Below this many bars no trendlines are built
    pub min_bars: usize,
    // Relative distance between line and wick that counts as a touch
    pub touch_tolerance: f64,
    pub min_touches: usize,
    // Touch count that maps to strength 1.0
    pub full_strength_touches: f64,
}

impl Default for TrendlineSettings {
    fn default() -> Self {
        Self {
            pivot_order: 3,
            min_bars: 20,
            touch_tolerance: 0.005,
            min_touches: 2,
            full_strength_touches: 5.0,
        }
    }
}

/// Settings for support/resistance level generation and consolidation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelSettings {
    pub lookback: usize,
    pub pivot_order: usize,
    // Bars strictly above this volume quantile of the lookback window become levels
    pub volume_quantile: f64,
    // Psychological levels are kept within +/- this fraction of current price
    pub psychological_range: f64,
    pub psychological_bases: Vec<f64>,
    pub psychological_max_multiplier: u32,
    // Trailing window for the "52 week" high/low (~252 trading days)
    pub year_lookback: usize,
    pub consolidation_tolerance: f64,
}

impl Default for LevelSettings {
    fn default() -> Self {
        Self {
            lookback: 50,
            pivot_order: 2,
            volume_quantile: 0.7,
            psychological_range: 0.2,
            psychological_bases: PSYCHOLOGICAL_BASES.to_vec(),
            psychological_max_multiplier: 99,
            year_lookback: 252,
            consolidation_tolerance: 0.02,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FibonacciSettings {
    pub min_bars: usize,
    pub trend_window: usize,
    // Window searched for the anchoring swing extreme
    pub swing_lookback: usize,
    pub ratios: Vec<f64>,
}

impl Default for FibonacciSettings {
    fn default() -> Self {
        Self {
            min_bars: 20,
            trend_window: 20,
            swing_lookback: 50,
            ratios: DEFAULT_FIB_RATIOS.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureSettings {
    pub min_bars: usize,
    pub trend_window: usize,
    pub swing_order: usize,
    pub volatility_window: usize,
    // stdev(highs) / mean(close) above this is choppy
    pub volatility_threshold: f64,
    // Short and long windows for the volume trend
    pub volume_fast_window: usize,
    pub volume_slow_window: usize,
}

impl Default for StructureSettings {
    fn default() -> Self {
        Self {
            min_bars: 20,
            trend_window: 20,
            swing_order: 3,
            volatility_window: 20,
            volatility_threshold: 0.05,
            volume_fast_window: 5,
            volume_slow_window: 20,
        }
    }
}

/// Settings for liquidity zone confluence scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneSettings {
    pub min_daily_bars: usize,
    pub offsets: Vec<f64>,

    pub trendline_top_k: usize,
    pub trendline_tolerance: f64,
    pub trendline_weight: f64,

    pub level_top_k: usize,
    pub level_tolerance: f64,

    pub fib_tolerance: f64,
    pub fib_score: f64,

    pub volume_quantile: f64,
    pub volume_tolerance: f64,
    pub volume_score: f64,

    pub min_confirmations: usize,
    pub max_zones: usize,
}

impl Default for ZoneSettings {
    fn default() -> Self {
        Self {
            min_daily_bars: 50,
            offsets: ZONE_OFFSETS.to_vec(),
            trendline_top_k: 5,
            trendline_tolerance: 0.02,
            trendline_weight: 2.0,
            level_top_k: 10,
            level_tolerance: 0.015,
            fib_tolerance: 0.01,
            fib_score: 2.0,
            volume_quantile: 0.7,
            volume_tolerance: 0.02,
            volume_score: 1.0,
            min_confirmations: 3,
            max_zones: 5,
        }
    }
}

/// The Master Analysis Configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub trendlines: TrendlineSettings,
    pub levels: LevelSettings,
    pub fibonacci: FibonacciSettings,
    pub structure: StructureSettings,
    pub zones: ZoneSettings,
}
