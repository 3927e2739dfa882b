use serde::{Deserialize, Serialize};

/// Trend from regression slopes of highs and lows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Trend {
    Bullish,
    Bearish,
    #[default]
    Sideways,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StructureQuality {
    Clean,
    Choppy,
    InsufficientData,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwingKind {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub index: usize,
    pub timestamp_ms: i64,
    pub price: f64,
    pub kind: SwingKind,
}

/// Three consecutive swings: High -> Low -> Higher High (bullish) or
/// Low -> High -> Lower Low (bearish).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pullback {
    pub trend: Trend,
    pub start: SwingPoint,
    pub extreme: SwingPoint,
    pub continuation: SwingPoint,
    /// Retracement as a fraction of the start swing price.
    pub pullback_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceStructure {
    pub trend: Trend,
    pub swing_highs: Vec<SwingPoint>,
    pub swing_lows: Vec<SwingPoint>,
    pub pullbacks: Vec<Pullback>,
    pub quality: StructureQuality,
}

impl PriceStructure {
    pub fn insufficient() -> Self {
        Self {
            trend: Trend::Sideways,
            swing_highs: Vec::new(),
            swing_lows: Vec::new(),
            pullbacks: Vec::new(),
            quality: StructureQuality::InsufficientData,
        }
    }
}
