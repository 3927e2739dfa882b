use std::fmt;

use itertools::Itertools;
use serde::Serialize;

use crate::domain::MarketData;
use crate::models::{EntryModel, TradingOpportunity};
use crate::utils::maths_utils::mean;

/// What happened to one symbol in a batch
#[derive(Debug, Clone)]
pub enum SymbolOutcome {
    /// Analysis ran; the list may be empty
    Screened(Vec<TradingOpportunity>),
    /// No data or a filter rejected the symbol before entry detection
    Skipped(String),
    /// Fetch or analysis task failed
    Failed(String),
    Cancelled,
}

impl fmt::Display for SymbolOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolOutcome::Screened(opps) => write!(f, "{} opportunities", opps.len()),
            SymbolOutcome::Skipped(reason) => write!(f, "skipped ({})", reason),
            SymbolOutcome::Failed(reason) => write!(f, "failed ({})", reason),
            SymbolOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// The result returned for each symbol
#[derive(Debug, Clone)]
pub struct SymbolReport {
    pub symbol: String,
    pub duration_ms: u128,
    pub outcome: SymbolOutcome,
    // Fetched data, kept for the snapshot cache
    pub data: Option<MarketData>,
}

/// Every symbol's outcome in input order plus the globally ranked opportunities.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub reports: Vec<SymbolReport>,
    pub opportunities: Vec<TradingOpportunity>,
    pub elapsed_ms: u128,
}

impl BatchReport {
    /// Flatten in input order, then stable-sort by confluence so ties keep symbol order.
    pub fn from_reports(reports: Vec<SymbolReport>, elapsed_ms: u128) -> Self {
        let mut opportunities: Vec<TradingOpportunity> = reports
            .iter()
            .filter_map(|r| match &r.outcome {
                SymbolOutcome::Screened(opps) => Some(opps.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect();
        opportunities.sort_by(|a, b| b.confluence_score.total_cmp(&a.confluence_score));

        Self {
            reports,
            opportunities,
            elapsed_ms,
        }
    }

    pub fn screened(&self) -> usize {
        self.count(|o| matches!(o, SymbolOutcome::Screened(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, SymbolOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, SymbolOutcome::Failed(_)))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|o| matches!(o, SymbolOutcome::Cancelled))
    }

    fn count(&self, pred: impl Fn(&SymbolOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.outcome)).count()
    }

    /// Take the fetched data out of every report.
    pub fn take_loaded_data(&mut self) -> Vec<MarketData> {
        self.reports.iter_mut().filter_map(|r| r.data.take()).collect()
    }

    pub fn summary(&self) -> ScreeningSummary {
        ScreeningSummary::from_opportunities(&self.opportunities)
    }

    pub fn log_summary(&self) {
        log::info!(
            "Screened {} symbols in {}ms: {} analysed, {} skipped, {} failed, {} cancelled, {} opportunities",
            self.reports.len(),
            self.elapsed_ms,
            self.screened(),
            self.skipped(),
            self.failed(),
            self.cancelled(),
            self.opportunities.len()
        );
    }
}

/// Aggregate statistics over a ranked opportunity list
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScreeningSummary {
    pub total_opportunities: usize,
    pub model1_count: usize,
    pub model2_count: usize,
    pub avg_risk_reward: f64,
    pub avg_confluence: f64,
    pub avg_risk_percentage: f64,
    pub avg_reward_percentage: f64,
    pub best_opportunity: Option<TradingOpportunity>,
    /// Distinct symbols, best first
    pub symbols: Vec<String>,
}

impl ScreeningSummary {
    pub fn from_opportunities(opportunities: &[TradingOpportunity]) -> Self {
        if opportunities.is_empty() {
            return Self::default();
        }

        let model_count = |model: EntryModel| {
            opportunities
                .iter()
                .filter(|o| o.entry_model == model)
                .count()
        };
        let avg = |f: fn(&TradingOpportunity) -> f64| {
            mean(&opportunities.iter().map(f).collect::<Vec<_>>())
        };

        // First of equal scores wins
        let best = opportunities.iter().fold(None, |best: Option<&TradingOpportunity>, o| {
            match best {
                Some(b) if b.confluence_score >= o.confluence_score => Some(b),
                _ => Some(o),
            }
        });

        Self {
            total_opportunities: opportunities.len(),
            model1_count: model_count(EntryModel::DirectEntry),
            model2_count: model_count(EntryModel::ConfirmationEntry),
            avg_risk_reward: avg(|o| o.risk_reward_ratio),
            avg_confluence: avg(|o| o.confluence_score),
            avg_risk_percentage: avg(TradingOpportunity::risk_percentage),
            avg_reward_percentage: avg(TradingOpportunity::reward_percentage),
            best_opportunity: best.cloned(),
            symbols: opportunities
                .iter()
                .map(|o| o.symbol.clone())
                .unique()
                .collect(),
        }
    }
}
