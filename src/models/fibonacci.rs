use serde::{Deserialize, Serialize};

use crate::models::structure::Trend;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibLevel {
    pub ratio: f64,
    /// e.g. "fib_61.8"
    pub label: String,
    pub price: f64,
}

impl FibLevel {
    pub fn label_for(ratio: f64) -> String {
        format!("fib_{:.1}", ratio * 100.0)
    }
}

/// Retracement levels between an auto-detected swing high and swing low.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibonacciSet {
    pub trend: Trend,
    pub swing_high: f64,
    pub swing_high_index: usize,
    pub swing_low: f64,
    pub swing_low_index: usize,
    /// In configured ratio order.
    pub levels: Vec<FibLevel>,
}
