//! Entry model, risk and pre-screening configuration

use serde::{Deserialize, Serialize};

/// Settings shared by both entry models
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EntrySettings {
    pub min_risk_reward: f64,

    // Max |price - zone| / price for each model
    pub direct_distance_tolerance: f64,
    pub confirmation_distance_tolerance: f64,

    // Model 2: hourly window, break detection and retest
    pub hourly_window: usize,
    pub break_lookback: usize,
    pub break_buffer: f64,
    pub retest_lookback: usize,
    pub retest_distance_tolerance: f64,
    pub wick_body_ratio: f64,
    pub confirmation_bonus: f64,

    // Targets: levels must clear entry by this fraction, else fall back to a fixed move
    pub target_buffer: f64,
    pub fallback_target_pct: f64,

    // Stops: buffers beyond the zone, zone trendlines and the recent swing extreme
    pub zone_stop_buffer: f64,
    pub trendline_stop_buffer: f64,
    pub swing_stop_buffer: f64,
    pub swing_window: usize,
}

impl Default for EntrySettings {
    fn default() -> Self {
        Self {
            min_risk_reward: 2.0,
            direct_distance_tolerance: 0.02,
            confirmation_distance_tolerance: 0.05,
            hourly_window: 200,
            break_lookback: 5,
            break_buffer: 0.005,
            retest_lookback: 3,
            retest_distance_tolerance: 0.02,
            wick_body_ratio: 1.5,
            confirmation_bonus: 1.0,
            target_buffer: 0.01,
            fallback_target_pct: 0.05,
            zone_stop_buffer: 0.02,
            trendline_stop_buffer: 0.02,
            swing_stop_buffer: 0.01,
            swing_window: 20,
        }
    }
}

/// Final validation applied to each opportunity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    // Fraction of entry price (0.05 = 5%)
    pub max_risk_per_trade: f64,
    pub min_confluence_score: f64,
    // Stdev of index close-to-close returns above this closes the market gate
    pub max_market_volatility: f64,
    pub market_window: usize,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_risk_per_trade: 0.05,
            min_confluence_score: 5.0,
            max_market_volatility: 0.05,
            market_window: 10,
        }
    }
}

/// Pre-screening filters on the daily series
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreScreenSettings {
    pub window: usize,
    pub min_price: f64,
    pub max_price: f64,
    pub min_avg_volume: f64,
    pub max_volatility: f64,
    pub max_avg_daily_change: f64,
}

impl Default for PreScreenSettings {
    fn default() -> Self {
        Self {
            window: 20,
            min_price: 50.0,
            max_price: 5000.0,
            min_avg_volume: 50_000.0,
            max_volatility: 0.1,
            max_avg_daily_change: 0.15,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub entry: EntrySettings,
    pub risk: RiskLimits,
    pub pre_screen: PreScreenSettings,
}
