// Domain models for setup screening
// Plain typed records produced by the analysis engines; no analysis logic lives here

pub mod fibonacci;
pub mod level;
pub mod liquidity_zone;
pub mod opportunity;
pub mod structure;
pub mod trendline;

// Re-export key types for convenience
pub use fibonacci::{FibLevel, FibonacciSet};
pub use level::{Level, LevelSource};
pub use liquidity_zone::{Confirmation, LiquidityZone};
pub use opportunity::{
    Direction, EntryModel, RiskReward, TimeframeSummary, TradingOpportunity, VolumeTrend,
};
pub use structure::{PriceStructure, Pullback, StructureQuality, SwingKind, SwingPoint, Trend};
pub use trendline::{Anchor, LineKind, TrendDirection, Trendline};
