use std::collections::BTreeMap;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::models::liquidity_zone::{Confirmation, LiquidityZone};
use crate::models::structure::{StructureQuality, Trend};
use crate::models::trendline::Trendline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum_macros::Display)]
pub enum EntryModel {
    #[strum(serialize = "Model1_Direct_Entry")]
    #[serde(rename = "Model1_Direct_Entry")]
    DirectEntry,
    #[strum(serialize = "Model2_Confirmation_Entry")]
    #[serde(rename = "Model2_Confirmation_Entry")]
    ConfirmationEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
}

/// Risk and reward legs of a trade, both strictly positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskReward {
    pub risk: f64,
    pub reward: f64,
    pub ratio: f64,
}

impl RiskReward {
    /// None unless both legs are strictly positive.
    pub fn compute(direction: Direction, entry: f64, stop: f64, target: f64) -> Option<Self> {
        let (risk, reward) = match direction {
            Direction::Long => (entry - stop, target - entry),
            Direction::Short => (stop - entry, entry - target),
        };
        if !(risk > 0.0 && reward > 0.0) {
            return None;
        }
        Some(Self {
            risk,
            reward,
            ratio: reward / risk,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VolumeTrend {
    Increasing,
    Decreasing,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeframeSummary {
    pub trend: Trend,
    pub structure_quality: StructureQuality,
    pub current_price: Option<f64>,
    pub volume_trend: VolumeTrend,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradingOpportunity {
    pub symbol: String,
    pub entry_model: EntryModel,
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub target: f64,
    pub risk_reward_ratio: f64,
    pub confluence_score: f64,
    pub confirmations: Vec<Confirmation>,
    pub timeframe_analysis: BTreeMap<String, TimeframeSummary>,
    pub zone: LiquidityZone,
    pub broken_trendline: Option<Trendline>,
    pub notes: String,
    pub created_at_ms: i64,
}

impl TradingOpportunity {
    /// Stop distance as a percentage of entry.
    pub fn risk_percentage(&self) -> f64 {
        (self.entry_price - self.stop_loss).abs() / self.entry_price * 100.0
    }

    /// Target distance as a percentage of entry.
    pub fn reward_percentage(&self) -> f64 {
        (self.target - self.entry_price).abs() / self.entry_price * 100.0
    }
}

// Written by hand so the derived percentages travel with the report.
impl Serialize for TradingOpportunity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TradingOpportunity", 16)?;
        state.serialize_field("symbol", &self.symbol)?;
        state.serialize_field("entry_model", &self.entry_model)?;
        state.serialize_field("direction", &self.direction)?;
        state.serialize_field("entry_price", &self.entry_price)?;
        state.serialize_field("stop_loss", &self.stop_loss)?;
        state.serialize_field("target", &self.target)?;
        state.serialize_field("risk_reward_ratio", &self.risk_reward_ratio)?;
        state.serialize_field("risk_percentage", &self.risk_percentage())?;
        state.serialize_field("reward_percentage", &self.reward_percentage())?;
        state.serialize_field("confluence_score", &self.confluence_score)?;
        state.serialize_field("confirmations", &self.confirmations)?;
        state.serialize_field("timeframe_analysis", &self.timeframe_analysis)?;
        state.serialize_field("zone", &self.zone)?;
        state.serialize_field("broken_trendline", &self.broken_trendline)?;
        state.serialize_field("notes", &self.notes)?;
        state.serialize_field("created_at_ms", &self.created_at_ms)?;
        state.end()
    }
}
