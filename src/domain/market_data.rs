use std::collections::BTreeMap;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::domain::candle::Bar;

pub const DAILY: &str = "daily";
pub const HOURLY: &str = "hourly";

// ============================================================================
// Series: column-wise OHLCV bars for one timeframe
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(try_from = "SeriesColumns")]
pub struct Series {
    pub timeframe: String,
    pub timestamps_ms: Vec<i64>,

    // Prices
    pub open_prices: Vec<f64>,
    pub high_prices: Vec<f64>,
    pub low_prices: Vec<f64>,
    pub close_prices: Vec<f64>,

    pub volumes: Vec<f64>,
}

/// Wire shape of a series before validation.
#[derive(Deserialize)]
struct SeriesColumns {
    timeframe: String,
    timestamps_ms: Vec<i64>,
    open_prices: Vec<f64>,
    high_prices: Vec<f64>,
    low_prices: Vec<f64>,
    close_prices: Vec<f64>,
    volumes: Vec<f64>,
}

impl TryFrom<SeriesColumns> for Series {
    type Error = anyhow::Error;

    fn try_from(raw: SeriesColumns) -> Result<Self> {
        let series = Series {
            timeframe: raw.timeframe,
            timestamps_ms: raw.timestamps_ms,
            open_prices: raw.open_prices,
            high_prices: raw.high_prices,
            low_prices: raw.low_prices,
            close_prices: raw.close_prices,
            volumes: raw.volumes,
        };
        series.validate()?;
        Ok(series)
    }
}

impl Series {
    /// Build a series from bars, rejecting non-ascending or duplicate timestamps and
    /// non-finite values.
    pub fn from_bars(timeframe: impl Into<String>, bars: &[Bar]) -> Result<Self> {
        let series = Series {
            timeframe: timeframe.into(),
            timestamps_ms: bars.iter().map(|b| b.timestamp_ms).collect(),
            open_prices: bars.iter().map(|b| b.open).collect(),
            high_prices: bars.iter().map(|b| b.high).collect(),
            low_prices: bars.iter().map(|b| b.low).collect(),
            close_prices: bars.iter().map(|b| b.close).collect(),
            volumes: bars.iter().map(|b| b.volume).collect(),
        };
        series.validate()?;
        Ok(series)
    }

    /// Columns share one length, every bar is finite and timestamps strictly ascend.
    pub fn validate(&self) -> Result<()> {
        let len = self.timestamps_ms.len();
        let columns = [
            ("open", self.open_prices.len()),
            ("high", self.high_prices.len()),
            ("low", self.low_prices.len()),
            ("close", self.close_prices.len()),
            ("volume", self.volumes.len()),
        ];
        if let Some((name, other)) = columns.iter().find(|(_, n)| *n != len) {
            bail!(
                "{}: {} column has {} values but there are {} timestamps",
                self.timeframe,
                name,
                other,
                len
            );
        }

        for idx in 0..len {
            let bar = self.bar(idx);
            if !bar.is_finite() {
                bail!(
                    "{}: bar {} at {} has non-finite OHLCV values",
                    self.timeframe,
                    idx,
                    bar.timestamp_ms
                );
            }
            if idx > 0 && bar.timestamp_ms <= self.timestamps_ms[idx - 1] {
                bail!(
                    "{}: timestamps must be strictly ascending (bar {}: {} after {})",
                    self.timeframe,
                    idx,
                    bar.timestamp_ms,
                    self.timestamps_ms[idx - 1]
                );
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.close_prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close_prices.is_empty()
    }

    pub fn bar(&self, idx: usize) -> Bar {
        Bar::new(
            self.timestamps_ms[idx],
            self.open_prices[idx],
            self.high_prices[idx],
            self.low_prices[idx],
            self.close_prices[idx],
            self.volumes[idx],
        )
    }

    /// The trailing `n` bars (the whole series when shorter), re-indexed from zero.
    pub fn tail(&self, n: usize) -> Series {
        let start = self.len().saturating_sub(n);
        Series {
            timeframe: self.timeframe.clone(),
            timestamps_ms: self.timestamps_ms[start..].to_vec(),
            open_prices: self.open_prices[start..].to_vec(),
            high_prices: self.high_prices[start..].to_vec(),
            low_prices: self.low_prices[start..].to_vec(),
            close_prices: self.close_prices[start..].to_vec(),
            volumes: self.volumes[start..].to_vec(),
        }
    }

    /// Start index of the trailing `n` bars.
    pub fn tail_start(&self, n: usize) -> usize {
        self.len().saturating_sub(n)
    }

    pub fn last_close(&self) -> Option<f64> {
        self.close_prices.last().copied()
    }

    pub fn first_timestamp_ms(&self) -> Option<i64> {
        self.timestamps_ms.first().copied()
    }

    pub fn last_timestamp_ms(&self) -> Option<i64> {
        self.timestamps_ms.last().copied()
    }
}

// ============================================================================
// MarketData: one symbol across timeframes
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct MarketData {
    pub symbol: String,
    pub timeframes: BTreeMap<String, Series>,
}

impl MarketData {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframes: BTreeMap::new(),
        }
    }

    pub fn with_series(mut self, series: Series) -> Self {
        self.timeframes.insert(series.timeframe.clone(), series);
        self
    }

    /// A timeframe that is present and non-empty. Empty timeframes read as absent.
    pub fn timeframe(&self, name: &str) -> Option<&Series> {
        self.timeframes.get(name).filter(|s| !s.is_empty())
    }

    pub fn daily(&self) -> Option<&Series> {
        self.timeframe(DAILY)
    }

    pub fn hourly(&self) -> Option<&Series> {
        self.timeframe(HOURLY)
    }

    /// Last close of the daily series.
    pub fn current_price(&self) -> Option<f64> {
        self.daily().and_then(Series::last_close)
    }

    pub fn is_valid(&self) -> bool {
        self.timeframes.values().any(|s| !s.is_empty())
    }

    /// Non-empty timeframes in name order.
    pub fn valid_timeframes(&self) -> impl Iterator<Item = (&String, &Series)> {
        self.timeframes.iter().filter(|(_, s)| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64, close: f64) -> Bar {
        Bar::new(ts, close, close + 1.0, close - 1.0, close, 100.0)
    }

    #[test]
    fn rejects_unordered_and_duplicate_timestamps() {
        assert!(Series::from_bars(DAILY, &[bar(2, 10.0), bar(1, 11.0)]).is_err());
        assert!(Series::from_bars(DAILY, &[bar(1, 10.0), bar(1, 11.0)]).is_err());
        assert!(Series::from_bars(DAILY, &[bar(1, f64::NAN)]).is_err());
        assert!(Series::from_bars(DAILY, &[bar(1, 10.0), bar(2, 11.0)]).is_ok());
    }

    #[test]
    fn decoding_rejects_uneven_columns() {
        let series = Series::from_bars(DAILY, &[bar(1, 10.0), bar(2, 11.0)]).unwrap();
        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(serde_json::from_str::<Series>(&json).unwrap(), series);

        let mut uneven = series.clone();
        uneven.close_prices.push(12.0);
        let json = serde_json::to_string(&uneven).unwrap();
        let err = serde_json::from_str::<Series>(&json).unwrap_err();
        assert!(err.to_string().contains("close column"), "{}", err);

        let mut unordered = series;
        unordered.timestamps_ms.reverse();
        let json = serde_json::to_string(&unordered).unwrap();
        assert!(serde_json::from_str::<Series>(&json).is_err());
    }

    #[test]
    fn tail_reindexes_from_zero() {
        let bars: Vec<Bar> = (0..10).map(|i| bar(i, 100.0 + i as f64)).collect();
        let series = Series::from_bars(DAILY, &bars).unwrap();

        let tail = series.tail(3);
        assert_eq!(tail.len(), 3);
        assert_eq!(tail.close_prices, vec![107.0, 108.0, 109.0]);
        assert_eq!(series.tail(50).len(), 10);
        assert_eq!(series.tail_start(3), 7);
    }

    #[test]
    fn empty_timeframes_read_as_absent() {
        let daily = Series::from_bars(DAILY, &[bar(1, 50.0), bar(2, 55.0)]).unwrap();
        let hourly = Series::from_bars(HOURLY, &[]).unwrap();
        let data = MarketData::new("ACME").with_series(daily).with_series(hourly);

        assert_eq!(data.current_price(), Some(55.0));
        assert!(data.hourly().is_none());
        assert!(data.is_valid());
        assert_eq!(data.valid_timeframes().count(), 1);

        let empty = MarketData::new("NONE").with_series(Series::from_bars(DAILY, &[]).unwrap());
        assert!(!empty.is_valid());
        assert_eq!(empty.current_price(), None);
    }
}
