//! Liquidity zones: candidate prices around the current price scored by confluence
//! with trendlines, levels, Fibonacci retracements and high-volume bars.

#[cfg(debug_assertions)]
use crate::config::DEBUG_FLAGS;
use crate::analysis::fibonacci::calculate_fibonacci;
use crate::analysis::levels::find_levels;
use crate::analysis::structure::identify_structure;
use crate::analysis::trendlines::detect_trendlines;
use crate::config::{AnalysisConfig, ZoneSettings};
use crate::domain::{MarketData, Series};
use crate::models::{
    Confirmation, FibonacciSet, Level, LineKind, LiquidityZone, PriceStructure, Trendline,
};
use crate::utils::ToleranceBand;
use crate::utils::maths_utils::{quantile, relative_distance};

/// Every engine's output for one series, computed once and shared by the zone scorer
/// and the entry models.
#[derive(Debug, Clone)]
pub struct TechnicalSnapshot {
    pub current_price: f64,
    pub trendlines: Vec<Trendline>,
    pub levels: Vec<Level>,
    pub fibonacci: Option<FibonacciSet>,
    pub structure: PriceStructure,
}

impl TechnicalSnapshot {
    /// None for an empty series.
    pub fn compute(series: &Series, config: &AnalysisConfig) -> Option<Self> {
        let current_price = series.last_close()?;
        Some(Self {
            current_price,
            trendlines: detect_trendlines(series, &config.trendlines),
            levels: find_levels(series, &config.levels),
            fibonacci: calculate_fibonacci(series, &config.fibonacci),
            structure: identify_structure(series, &config.structure),
        })
    }
}

pub struct LiquidityZoneScorer<'a> {
    settings: &'a ZoneSettings,
}

impl<'a> LiquidityZoneScorer<'a> {
    pub fn new(settings: &'a ZoneSettings) -> Self {
        Self { settings }
    }

    /// Candidate (price, kind) pairs at the configured offsets. Negative offsets are
    /// support, positive resistance.
    pub fn candidate_prices(&self, current_price: f64) -> Vec<(f64, LineKind)> {
        self.settings
            .offsets
            .iter()
            .map(|&pct| {
                let kind = if pct < 0.0 {
                    LineKind::Support
                } else {
                    LineKind::Resistance
                };
                (current_price * (1.0 + pct), kind)
            })
            .collect()
    }

    /// Whether any bar with volume above the threshold has its high or low near `price`.
    fn has_volume_confluence(&self, daily: &Series, price: f64, threshold: f64) -> bool {
        let band = ToleranceBand::new(self.settings.volume_tolerance);
        (0..daily.len()).any(|i| {
            daily.volumes[i] > threshold
                && (band.matches(daily.high_prices[i], price)
                    || band.matches(daily.low_prices[i], price))
        })
    }

    fn score_candidate(
        &self,
        price: f64,
        kind: LineKind,
        snapshot: &TechnicalSnapshot,
        daily: &Series,
        volume_threshold: Option<f64>,
    ) -> Option<LiquidityZone> {
        let s = self.settings;
        let trendline_band = ToleranceBand::new(s.trendline_tolerance);
        let level_band = ToleranceBand::new(s.level_tolerance);
        let fib_band = ToleranceBand::new(s.fib_tolerance);

        let mut confirmations = Vec::new();
        let mut score = 0.0;

        for line in snapshot.trendlines.iter().take(s.trendline_top_k) {
            if trendline_band.matches(price, line.current_level) {
                confirmations.push(Confirmation::Trendline {
                    kind: line.kind,
                    direction: line.direction,
                });
                score += line.strength * s.trendline_weight;
            }
        }

        for level in snapshot.levels.iter().take(s.level_top_k) {
            if level_band.matches(price, level.price)
                && let Some(source) = level.primary_source()
            {
                confirmations.push(Confirmation::Level {
                    kind: level.kind,
                    source,
                });
                score += level.weight();
            }
        }

        if let Some(fib) = &snapshot.fibonacci {
            for fib_level in &fib.levels {
                if fib_band.matches(price, fib_level.price) {
                    confirmations.push(Confirmation::Fibonacci {
                        label: fib_level.label.clone(),
                    });
                    score += s.fib_score;
                }
            }
        }

        if let Some(threshold) = volume_threshold
            && self.has_volume_confluence(daily, price, threshold)
        {
            confirmations.push(Confirmation::HighVolume);
            score += s.volume_score;
        }

        if confirmations.len() < s.min_confirmations {
            return None;
        }

        Some(LiquidityZone {
            price,
            kind,
            confirmations,
            confluence_score: score,
            distance_from_price: relative_distance(price, snapshot.current_price)?,
            trendlines: snapshot
                .trendlines
                .iter()
                .filter(|l| trendline_band.matches(price, l.current_level))
                .cloned()
                .collect(),
            levels: snapshot
                .levels
                .iter()
                .filter(|l| level_band.matches(price, l.price))
                .cloned()
                .collect(),
            fibonacci: snapshot.fibonacci.clone(),
            structure: snapshot.structure.clone(),
        })
    }

    /// Score every candidate and keep the best, ordered by score (desc) then distance
    /// from the current price (asc).
    pub fn score_zones(&self, snapshot: &TechnicalSnapshot, daily: &Series) -> Vec<LiquidityZone> {
        if !(snapshot.current_price > 0.0) {
            return Vec::new();
        }
        let volume_threshold = quantile(&daily.volumes, self.settings.volume_quantile);

        let mut zones: Vec<LiquidityZone> = self
            .candidate_prices(snapshot.current_price)
            .into_iter()
            .filter_map(|(price, kind)| {
                self.score_candidate(price, kind, snapshot, daily, volume_threshold)
            })
            .collect();

        zones.sort_by(|a, b| {
            b.confluence_score
                .total_cmp(&a.confluence_score)
                .then(a.distance_from_price.total_cmp(&b.distance_from_price))
        });
        zones.truncate(self.settings.max_zones);
        zones
    }

    /// Zones for a symbol from its daily series. Empty when the daily series is
    /// missing or too short, or the current price is not positive.
    pub fn find_zones(&self, data: &MarketData, config: &AnalysisConfig) -> Vec<LiquidityZone> {
        let Some(daily) = data.daily() else {
            log::debug!("{}: no daily data, skipping zone scoring", data.symbol);
            return Vec::new();
        };
        if daily.len() < self.settings.min_daily_bars {
            log::debug!(
                "{}: {} daily bars, need {} for zone scoring",
                data.symbol,
                daily.len(),
                self.settings.min_daily_bars
            );
            return Vec::new();
        }
        let Some(snapshot) = TechnicalSnapshot::compute(daily, config) else {
            return Vec::new();
        };
        let zones = self.score_zones(&snapshot, daily);

        #[cfg(debug_assertions)]
        if DEBUG_FLAGS.print_zone_scoring_for_symbol == data.symbol {
            for zone in &zones {
                log::info!(
                    "[zones] {} {} {:.2} score {:.2} dist {:.3} tags {:?}",
                    data.symbol,
                    zone.kind,
                    zone.price,
                    zone.confluence_score,
                    zone.distance_from_price,
                    zone.confirmations
                        .iter()
                        .map(|c| c.to_string())
                        .collect::<Vec<_>>()
                );
            }
        }

        zones
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{Bar, DAILY};
    use crate::models::{FibLevel, LevelSource, Trend};

    pub(crate) fn flat_daily(n: usize, price: f64, volume: f64) -> Series {
        let bars: Vec<Bar> = (0..n)
            .map(|i| Bar::new(i as i64, price, price, price, price, volume))
            .collect();
        Series::from_bars(DAILY, &bars).unwrap()
    }

    pub(crate) fn snapshot_at(current_price: f64) -> TechnicalSnapshot {
        TechnicalSnapshot {
            current_price,
            trendlines: Vec::new(),
            levels: Vec::new(),
            fibonacci: None,
            structure: PriceStructure::insufficient(),
        }
    }

    fn level(price: f64, kind: LineKind, strength: u32, source: LevelSource) -> Level {
        Level::new(price, kind, strength, source)
    }

    fn fib_at(prices: &[f64]) -> FibonacciSet {
        FibonacciSet {
            trend: Trend::Bearish,
            swing_high: 120.0,
            swing_high_index: 0,
            swing_low: 80.0,
            swing_low_index: 1,
            levels: prices
                .iter()
                .map(|&price| FibLevel {
                    ratio: 0.5,
                    label: FibLevel::label_for(0.5),
                    price,
                })
                .collect(),
        }
    }

    #[test]
    fn candidates_split_by_offset_sign() {
        let settings = ZoneSettings::default();
        let scorer = LiquidityZoneScorer::new(&settings);
        let candidates = scorer.candidate_prices(100.0);

        assert_eq!(candidates.len(), 14);
        assert_eq!(candidates[0].1, LineKind::Support);
        assert!((candidates[0].0 - 85.0).abs() < 1e-9);
        assert_eq!(candidates[13].1, LineKind::Resistance);
        assert_eq!(
            candidates.iter().filter(|(_, k)| *k == LineKind::Support).count(),
            7
        );
    }

    #[test]
    fn zone_needs_minimum_confirmations() {
        let settings = ZoneSettings::default();
        let scorer = LiquidityZoneScorer::new(&settings);
        let daily = flat_daily(60, 100.0, 10.0);

        let mut snapshot = snapshot_at(100.0);
        snapshot.levels = vec![
            level(95.0, LineKind::Support, 3, LevelSource::AllTimeLow),
            level(95.2, LineKind::Support, 1, LevelSource::PivotLow),
        ];
        assert!(scorer.score_zones(&snapshot, &daily).is_empty(), "two tags is not enough");

        snapshot.fibonacci = Some(fib_at(&[95.1]));
        let zones = scorer.score_zones(&snapshot, &daily);
        assert_eq!(zones.len(), 1);
        let zone = &zones[0];
        assert_eq!(zone.kind, LineKind::Support);
        assert_eq!(zone.confirmation_count(), 3);
        // 3*1 + 1*1 + 2
        assert!((zone.confluence_score - 6.0).abs() < 1e-9);
        assert_eq!(zone.confirmations[0].to_string(), "Level_support_all_time_low");
        assert_eq!(zone.levels.len(), 2);
    }

    #[test]
    fn zones_sort_by_score_then_distance() {
        let settings = ZoneSettings {
            min_confirmations: 1,
            level_tolerance: 0.001,
            ..Default::default()
        };
        let scorer = LiquidityZoneScorer::new(&settings);
        let daily = flat_daily(60, 100.0, 10.0);

        let mut snapshot = snapshot_at(100.0);
        // Equal scores at -3% and +2%, a stronger one at +10%
        snapshot.levels = vec![
            level(97.0, LineKind::Support, 1, LevelSource::PivotLow),
            level(102.0, LineKind::Resistance, 1, LevelSource::PivotHigh),
            level(110.0, LineKind::Resistance, 3, LevelSource::AllTimeHigh),
        ];
        let zones = scorer.score_zones(&snapshot, &daily);
        let prices: Vec<f64> = zones.iter().map(|z| (z.price * 100.0).round() / 100.0).collect();

        assert_eq!(prices[0], 110.0);
        assert_eq!(prices[1], 102.0, "closer zone wins a score tie");
        assert_eq!(prices[2], 97.0);
        for pair in zones.windows(2) {
            assert!(
                pair[0].confluence_score > pair[1].confluence_score
                    || (pair[0].confluence_score == pair[1].confluence_score
                        && pair[0].distance_from_price <= pair[1].distance_from_price)
            );
        }
    }

    #[test]
    fn volume_confluence_uses_bars_above_quantile() {
        let settings = ZoneSettings::default();
        let scorer = LiquidityZoneScorer::new(&settings);
        let mut bars: Vec<Bar> = (0..60).map(|i| Bar::new(i, 100.0, 100.0, 100.0, 100.0, 10.0)).collect();
        bars[30] = Bar::new(30, 95.0, 95.5, 94.5, 95.0, 1_000.0);
        let daily = Series::from_bars(DAILY, &bars).unwrap();
        let threshold = quantile(&daily.volumes, 0.7).unwrap();

        assert!(scorer.has_volume_confluence(&daily, 95.0, threshold));
        assert!(!scorer.has_volume_confluence(&daily, 90.0, threshold));
    }

    #[test]
    fn short_or_missing_daily_yields_no_zones() {
        let settings = ZoneSettings::default();
        let scorer = LiquidityZoneScorer::new(&settings);
        let config = AnalysisConfig::default();

        let missing = MarketData::new("NONE");
        assert!(scorer.find_zones(&missing, &config).is_empty());

        let short = MarketData::new("SHORT").with_series(flat_daily(49, 100.0, 10.0));
        assert!(scorer.find_zones(&short, &config).is_empty());
    }
}
