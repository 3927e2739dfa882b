// Analysis engines, zone scoring, entry models and screening filters
pub mod entry_models;
pub mod fibonacci;
pub mod levels;
pub mod liquidity;
pub mod pivots;
pub mod screening;
pub mod structure;
pub mod symbol_analysis;
pub mod trendlines;

// Re-export commonly used types
pub use entry_models::{EntryModelDetector, SymbolContext};
pub use liquidity::{LiquidityZoneScorer, TechnicalSnapshot};
pub use screening::{MarketGate, PreScreenFailure, ValidationFailure, pre_screen, validate_opportunity};
pub use symbol_analysis::{ScreenSkip, SymbolAnalysis, analyze_symbol, screen_symbol};
