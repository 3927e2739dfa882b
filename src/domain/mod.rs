// Domain types and value objects
pub mod candle;
pub mod market_data;

// Re-export commonly used types
pub use candle::Bar;
pub use market_data::{DAILY, HOURLY, MarketData, Series};
