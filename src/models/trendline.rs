use serde::{Deserialize, Serialize};

/// Which side of price a line or level sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LineKind {
    Support,
    Resistance,
}

/// Sign of a trendline's slope. A flat line is bearish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrendDirection {
    Bullish,
    Bearish,
}

impl TrendDirection {
    pub fn from_slope(slope: f64) -> Self {
        if slope > 0.0 {
            TrendDirection::Bullish
        } else {
            TrendDirection::Bearish
        }
    }
}

/// An (index, price) anchor on the series the line was fitted to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub index: usize,
    pub price: f64,
}

/// A line through two same-type pivots. Indices refer to the series it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trendline {
    pub kind: LineKind,
    pub slope: f64,
    pub intercept: f64,
    pub start: Anchor,
    pub end: Anchor,
    /// Line value projected to the latest bar.
    pub current_level: f64,
    pub direction: TrendDirection,
    pub touches: usize,
    /// min(touches / full_strength_touches, 1.0)
    pub strength: f64,
}

impl Trendline {
    /// Fit a line through two anchors. None for a vertical pair.
    pub fn through(kind: LineKind, start: Anchor, end: Anchor, last_index: usize) -> Option<Self> {
        if start.index == end.index {
            return None;
        }
        let slope = (end.price - start.price) / (end.index as f64 - start.index as f64);
        let intercept = start.price - slope * start.index as f64;
        Some(Self {
            kind,
            slope,
            intercept,
            start,
            end,
            current_level: slope * last_index as f64 + intercept,
            direction: TrendDirection::from_slope(slope),
            touches: 0,
            strength: 0.0,
        })
    }

    pub fn value_at(&self, index: usize) -> f64 {
        self.slope * index as f64 + self.intercept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_through_two_anchors_projects_forward() {
        let line = Trendline::through(
            LineKind::Support,
            Anchor { index: 2, price: 10.0 },
            Anchor { index: 6, price: 18.0 },
            10,
        )
        .unwrap();

        assert_eq!(line.slope, 2.0);
        assert_eq!(line.intercept, 6.0);
        assert_eq!(line.current_level, 26.0);
        assert_eq!(line.value_at(0), 6.0);
        assert_eq!(line.direction, TrendDirection::Bullish);
    }

    #[test]
    fn vertical_pairs_are_rejected_and_flat_lines_are_bearish() {
        let a = Anchor { index: 3, price: 10.0 };
        assert!(Trendline::through(LineKind::Resistance, a, a, 5).is_none());

        let flat = Trendline::through(LineKind::Resistance, a, Anchor { index: 5, price: 10.0 }, 9)
            .unwrap();
        assert_eq!(flat.direction, TrendDirection::Bearish);
        assert_eq!(format!("{}_{}", flat.kind, flat.direction), "resistance_bearish");
    }
}
