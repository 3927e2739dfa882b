//! Batch screening: an async runner over a provider and a rayon path over loaded data.

pub mod core;
pub mod fetch;
pub mod gate;
pub mod messages;
pub mod worker;

// Re-export key components
pub use self::core::BatchScreener;
pub use fetch::Fetcher;
pub use gate::RateGate;
pub use messages::{BatchReport, ScreeningSummary, SymbolOutcome, SymbolReport};
pub use worker::{screen_collection, screen_offline};
