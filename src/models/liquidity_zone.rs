use std::fmt;

use serde::Serialize;

use crate::models::fibonacci::FibonacciSet;
use crate::models::level::{Level, LevelSource};
use crate::models::structure::PriceStructure;
use crate::models::trendline::{LineKind, TrendDirection, Trendline};

/// One piece of evidence that a zone price is significant. Serialises as its
/// report tag, e.g. `Level_support_pivot_low`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "String")]
pub enum Confirmation {
    Trendline {
        kind: LineKind,
        direction: TrendDirection,
    },
    Level {
        kind: LineKind,
        source: LevelSource,
    },
    Fibonacci {
        label: String,
    },
    HighVolume,
    TrendlineBreak {
        kind: LineKind,
    },
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Confirmation::Trendline { kind, direction } => {
                write!(f, "Trendline_{}_{}", kind, direction)
            }
            Confirmation::Level { kind, source } => write!(f, "Level_{}_{}", kind, source),
            Confirmation::Fibonacci { label } => write!(f, "Fibonacci_{}", label),
            Confirmation::HighVolume => write!(f, "High_Volume_Level"),
            Confirmation::TrendlineBreak { kind } => write!(f, "Trendline_Break_{}", kind),
        }
    }
}

impl From<Confirmation> for String {
    fn from(confirmation: Confirmation) -> Self {
        confirmation.to_string()
    }
}

/// A candidate price near the current price that gathered enough confluence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiquidityZone {
    pub price: f64,
    pub kind: LineKind,
    pub confirmations: Vec<Confirmation>,
    pub confluence_score: f64,
    /// |price - current| / current
    pub distance_from_price: f64,
    /// Every trendline and level within the matching band, not only the scored top-K.
    pub trendlines: Vec<Trendline>,
    pub levels: Vec<Level>,
    pub fibonacci: Option<FibonacciSet>,
    pub structure: PriceStructure,
}

impl LiquidityZone {
    pub fn confirmation_count(&self) -> usize {
        self.confirmations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_tags_render_like_reports() {
        let cases = [
            (
                Confirmation::Trendline {
                    kind: LineKind::Support,
                    direction: TrendDirection::Bullish,
                },
                "Trendline_support_bullish",
            ),
            (
                Confirmation::Level {
                    kind: LineKind::Resistance,
                    source: LevelSource::YearHigh,
                },
                "Level_resistance_52week_high",
            ),
            (
                Confirmation::Fibonacci {
                    label: "fib_38.2".to_string(),
                },
                "Fibonacci_fib_38.2",
            ),
            (Confirmation::HighVolume, "High_Volume_Level"),
            (
                Confirmation::TrendlineBreak {
                    kind: LineKind::Resistance,
                },
                "Trendline_Break_resistance",
            ),
        ];
        for (confirmation, tag) in cases {
            assert_eq!(confirmation.to_string(), tag);
        }

        let json = serde_json::to_string(&vec![Confirmation::HighVolume]).unwrap();
        assert_eq!(json, r#"["High_Volume_Level"]"#);
    }
}
