//! Pre-screening, final opportunity validation and the market-condition gate.

use std::fmt;

use crate::config::{PreScreenSettings, RiskLimits};
use crate::domain::Series;
use crate::models::{StructureQuality, TradingOpportunity};
use crate::utils::maths_utils::{mean, pct_changes, sample_std_dev};

#[derive(Debug, Clone, PartialEq)]
pub enum PreScreenFailure {
    InsufficientData { bars: usize, needed: usize },
    PriceOutOfRange(f64),
    LowVolume(f64),
    TooVolatile(f64),
    ExcessiveMoves(f64),
}

impl fmt::Display for PreScreenFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PreScreenFailure::InsufficientData { bars, needed } => {
                write!(f, "insufficient data ({} bars, need {})", bars, needed)
            }
            PreScreenFailure::PriceOutOfRange(price) => write!(f, "price {:.2} out of range", price),
            PreScreenFailure::LowVolume(volume) => write!(f, "average volume {:.0} too low", volume),
            PreScreenFailure::TooVolatile(sd) => write!(f, "return volatility {:.4} too high", sd),
            PreScreenFailure::ExcessiveMoves(avg) => {
                write!(f, "average daily move {:.4} too large", avg)
            }
        }
    }
}

/// Liquidity, price and volatility filters over the trailing window of the daily series.
pub fn pre_screen(daily: &Series, settings: &PreScreenSettings) -> Result<(), PreScreenFailure> {
    let needed = settings.window + 1;
    if settings.window == 0 || daily.len() < needed {
        return Err(PreScreenFailure::InsufficientData {
            bars: daily.len(),
            needed,
        });
    }

    let price = daily.last_close().unwrap_or(f64::NAN);
    if !(settings.min_price..=settings.max_price).contains(&price) {
        return Err(PreScreenFailure::PriceOutOfRange(price));
    }

    let avg_volume = mean(&daily.volumes[daily.tail_start(settings.window)..]);
    if !(avg_volume >= settings.min_avg_volume) {
        return Err(PreScreenFailure::LowVolume(avg_volume));
    }

    let returns = pct_changes(&daily.close_prices[daily.tail_start(needed)..]);
    let volatility = sample_std_dev(&returns);
    if !(volatility <= settings.max_volatility) {
        return Err(PreScreenFailure::TooVolatile(volatility));
    }

    let abs_returns: Vec<f64> = returns.iter().map(|r| r.abs()).collect();
    let avg_move = mean(&abs_returns);
    if !(avg_move <= settings.max_avg_daily_change) {
        return Err(PreScreenFailure::ExcessiveMoves(avg_move));
    }

    Ok(())
}

/// Whether broad-market conditions allow new trades, from an optional index series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketGate {
    pub open: bool,
    pub volatility: Option<f64>,
}

impl MarketGate {
    pub const OPEN: MarketGate = MarketGate {
        open: true,
        volatility: None,
    };

    /// Open without an index or with too few bars; closed when the stdev of returns
    /// over the trailing window exceeds the limit.
    pub fn from_index(index: Option<&Series>, limits: &RiskLimits) -> Self {
        let Some(series) = index.filter(|s| s.len() >= limits.market_window.max(2)) else {
            log::warn!("No usable market index data, allowing trades by default");
            return Self::OPEN;
        };

        let returns = pct_changes(&series.close_prices[series.tail_start(limits.market_window)..]);
        let volatility = sample_std_dev(&returns);
        if !volatility.is_finite() {
            return Self::OPEN;
        }
        let open = volatility <= limits.max_market_volatility;
        if !open {
            log::warn!(
                "Market volatility {:.4} exceeds maximum {}",
                volatility,
                limits.max_market_volatility
            );
        }
        Self {
            open,
            volatility: Some(volatility),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationFailure {
    RiskTooHigh(f64),
    MarketClosed,
    ChoppyStructure,
    WeakConfluence(f64),
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValidationFailure::RiskTooHigh(pct) => write!(f, "risk {:.2}% exceeds maximum", pct),
            ValidationFailure::MarketClosed => write!(f, "market conditions not favorable"),
            ValidationFailure::ChoppyStructure => write!(f, "choppy structure"),
            ValidationFailure::WeakConfluence(score) => {
                write!(f, "confluence score {:.1} below minimum", score)
            }
        }
    }
}

/// Final risk, market, structure and confluence checks on a detected opportunity.
pub fn validate_opportunity(
    opportunity: &TradingOpportunity,
    limits: &RiskLimits,
    gate: &MarketGate,
) -> Result<(), ValidationFailure> {
    let risk_pct = opportunity.risk_percentage();
    if risk_pct > limits.max_risk_per_trade * 100.0 {
        return Err(ValidationFailure::RiskTooHigh(risk_pct));
    }
    if !gate.open {
        return Err(ValidationFailure::MarketClosed);
    }
    if opportunity.zone.structure.quality == StructureQuality::Choppy {
        return Err(ValidationFailure::ChoppyStructure);
    }
    if opportunity.confluence_score < limits.min_confluence_score {
        return Err(ValidationFailure::WeakConfluence(opportunity.confluence_score));
    }
    Ok(())
}
