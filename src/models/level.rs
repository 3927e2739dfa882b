use serde::{Deserialize, Serialize};

use crate::models::trendline::LineKind;

/// Generator that produced a raw level.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumIter,
)]
pub enum LevelSource {
    #[strum(serialize = "pivot_high")]
    #[serde(rename = "pivot_high")]
    PivotHigh,
    #[strum(serialize = "pivot_low")]
    #[serde(rename = "pivot_low")]
    PivotLow,
    #[strum(serialize = "high_volume")]
    #[serde(rename = "high_volume")]
    HighVolume,
    #[strum(serialize = "psychological")]
    #[serde(rename = "psychological")]
    Psychological,
    #[strum(serialize = "all_time_high")]
    #[serde(rename = "all_time_high")]
    AllTimeHigh,
    #[strum(serialize = "all_time_low")]
    #[serde(rename = "all_time_low")]
    AllTimeLow,
    #[strum(serialize = "52week_high")]
    #[serde(rename = "52week_high")]
    YearHigh,
    #[strum(serialize = "52week_low")]
    #[serde(rename = "52week_low")]
    YearLow,
}

/// A support or resistance price. Consolidated levels accumulate strength, touches
/// and sources from every raw level merged into them; the first source is the
/// level's primary tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub price: f64,
    pub kind: LineKind,
    pub strength: u32,
    pub touches: u32,
    pub sources: Vec<LevelSource>,
}

impl Level {
    pub fn new(price: f64, kind: LineKind, strength: u32, source: LevelSource) -> Self {
        Self {
            price,
            kind,
            strength,
            touches: 1,
            sources: vec![source],
        }
    }

    pub fn primary_source(&self) -> Option<LevelSource> {
        self.sources.first().copied()
    }

    /// Ranking weight used for ordering and zone scoring.
    pub fn weight(&self) -> f64 {
        (self.strength * self.touches) as f64
    }

    /// Fold another level into this one. Price and kind stay those of `self`.
    pub fn absorb(&mut self, other: Level) {
        self.strength += other.strength;
        self.touches += other.touches;
        self.sources.extend(other.sources);
    }
}
