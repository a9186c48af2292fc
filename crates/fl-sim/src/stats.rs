//! Summary statistics over batch aggregates

use serde::{Deserialize, Serialize};

use crate::batch::AggregateResult;

/// Arithmetic mean, or 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation, or 0 for an empty slice
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Report derived from one batch aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Overall return-to-player; `None` when nothing was wagered
    pub rtp: Option<f64>,
    /// Mean rounds per session
    pub avg_rounds: f64,
    /// Mean per-session profit relative to the funding reference
    pub avg_relative_profit: f64,
    /// Spread of relative session profits
    pub session_volatility: f64,
    /// Spread of per-round payout-to-wager ratios
    pub round_volatility: f64,
    /// Share of sessions that ended ahead of their reference
    pub profitable_rate: f64,
    /// Share of sessions that cleared their rollover target
    pub rollover_rate: f64,
    /// Share of sessions that went bankrupt
    pub bankruptcy_rate: f64,
}

impl BatchReport {
    pub fn from_aggregate(agg: &AggregateResult) -> Self {
        let sessions = agg.sessions.max(1) as f64;
        let profitable = agg
            .relative_profits
            .iter()
            .filter(|&&p| p > 0.0)
            .count() as f64;
        Self {
            rtp: agg.rtp(),
            avg_rounds: agg.rounds as f64 / sessions,
            avg_relative_profit: mean(&agg.relative_profits),
            session_volatility: std_dev(&agg.relative_profits),
            round_volatility: std_dev(&agg.payout_ratios),
            profitable_rate: profitable / sessions,
            rollover_rate: agg.rollover_hits as f64 / sessions,
            bankruptcy_rate: agg.bankruptcies as f64 / sessions,
        }
    }
}
