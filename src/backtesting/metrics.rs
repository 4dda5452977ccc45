//! Backtest Metrics
//!
//! Calculate metrics such as ROI, hit rate, drawdown, etc.

use super::simulator::BetLog;
use crate::models::Tier;
use serde::{Deserialize, Serialize};

/// Backtest evaluation metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestMetrics {
    // Basic metrics
    pub total_bets: usize,
    pub winning_bets: usize,
    pub hit_rate: f64,
    pub roi: f64,

    // Edge related
    pub avg_edge: f64,
    pub avg_odds: f64,
    pub avg_score: f64,

    // Risk metrics
    pub profit_factor: f64,
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,

    // Win/Loss
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub net_profit: f64,
}

impl Default for BacktestMetrics {
    fn default() -> Self {
        Self {
            total_bets: 0,
            winning_bets: 0,
            hit_rate: 0.0,
            roi: 0.0,
            avg_edge: 0.0,
            avg_odds: 0.0,
            avg_score: 0.0,
            profit_factor: 0.0,
            max_drawdown: 0.0,
            max_drawdown_pct: 0.0,
            gross_profit: 0.0,
            gross_loss: 0.0,
            net_profit: 0.0,
        }
    }
}

/// Calculate metrics from bet logs
pub fn calculate_metrics(bets: &[BetLog], total_stake: f64) -> BacktestMetrics {
    if bets.is_empty() {
        return BacktestMetrics::default();
    }

    // Basic metrics
    let total_bets = bets.len();
    let winning_bets = bets.iter().filter(|b| b.won).count();
    let hit_rate = winning_bets as f64 / total_bets as f64;

    // Edge related
    let avg_edge: f64 = bets.iter().map(|b| b.edge).sum::<f64>() / total_bets as f64;
    let avg_odds: f64 = bets.iter().map(|b| b.decimal_odds).sum::<f64>() / total_bets as f64;
    let avg_score: f64 = bets.iter().map(|b| b.score).sum::<f64>() / total_bets as f64;

    // Profit/Loss calculation
    let profits: Vec<f64> = bets.iter().map(|b| b.profit).collect();
    let gross_profit: f64 = profits.iter().filter(|&&p| p > 0.0).sum();
    let gross_loss: f64 = profits.iter().filter(|&&p| p < 0.0).map(|p| p.abs()).sum();
    let net_profit: f64 = profits.iter().sum();

    // Profit Factor
    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    // Drawdown calculation over the cumulative profit curve
    let mut cumulative: Vec<f64> = Vec::with_capacity(profits.len());
    let mut sum = 0.0;
    for &p in &profits {
        sum += p;
        cumulative.push(sum);
    }

    let mut peak = f64::MIN;
    let mut max_drawdown = 0.0;
    for &value in &cumulative {
        if value > peak {
            peak = value;
        }
        let drawdown = peak - value;
        if drawdown > max_drawdown {
            max_drawdown = drawdown;
        }
    }

    // Drawdown percentage
    let max_drawdown_pct = if total_stake > 0.0 {
        max_drawdown / total_stake
    } else {
        0.0
    };

    // ROI
    let roi = if total_stake > 0.0 {
        net_profit / total_stake
    } else {
        0.0
    };

    BacktestMetrics {
        total_bets,
        winning_bets,
        hit_rate,
        roi,
        avg_edge,
        avg_odds,
        avg_score,
        profit_factor,
        max_drawdown,
        max_drawdown_pct,
        gross_profit,
        gross_loss,
        net_profit,
    }
}

/// Calculate Sharpe ratio from bet logs
pub fn calculate_sharpe_ratio(bets: &[BetLog], risk_free_rate: f64) -> f64 {
    if bets.is_empty() {
        return 0.0;
    }

    let returns: Vec<f64> = bets
        .iter()
        .filter(|b| b.stake > 0.0)
        .map(|b| b.profit / b.stake)
        .collect();

    if returns.is_empty() {
        return 0.0;
    }

    let mean_return: f64 = returns.iter().sum::<f64>() / returns.len() as f64;

    let variance: f64 = returns
        .iter()
        .map(|r| (r - mean_return).powi(2))
        .sum::<f64>()
        / returns.len() as f64;

    let std_return = variance.sqrt();

    if std_return == 0.0 {
        return 0.0;
    }

    (mean_return - risk_free_rate) / std_return
}

/// Analysis results by dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionAnalysis {
    pub key: String,
    pub bets: usize,
    pub wins: usize,
    pub hit_rate: f64,
    pub stake: f64,
    pub profit: f64,
    pub roi: f64,
}

fn summarize(key: String, group: &[&BetLog]) -> DimensionAnalysis {
    let total = group.len();
    let wins = group.iter().filter(|b| b.won).count();
    let stake: f64 = group.iter().map(|b| b.stake).sum();
    let profit: f64 = group.iter().map(|b| b.profit).sum();

    DimensionAnalysis {
        key,
        bets: total,
        wins,
        hit_rate: if total > 0 {
            wins as f64 / total as f64
        } else {
            0.0
        },
        stake,
        profit,
        roi: if stake > 0.0 { profit / stake } else { 0.0 },
    }
}

/// Analyze bet results by recommendation tier
pub fn analyze_by_tier(bets: &[BetLog]) -> Vec<DimensionAnalysis> {
    use std::collections::BTreeMap;

    let mut grouped: BTreeMap<Tier, Vec<&BetLog>> = BTreeMap::new();
    for bet in bets {
        grouped.entry(bet.tier).or_default().push(bet);
    }

    grouped
        .iter()
        .map(|(tier, group)| summarize(tier.to_string(), group))
        .collect()
}

/// Analyze bet results by decimal odds range
pub fn analyze_by_odds_range(bets: &[BetLog]) -> Vec<DimensionAnalysis> {
    use std::collections::HashMap;

    let mut grouped: HashMap<&str, Vec<&BetLog>> = HashMap::new();
    for bet in bets {
        let key = if bet.decimal_odds < 1.7 {
            "favorite (<1.7)"
        } else if bet.decimal_odds < 2.5 {
            "mid (1.7-2.5)"
        } else {
            "longshot (>2.5)"
        };
        grouped.entry(key).or_default().push(bet);
    }

    let mut results: Vec<DimensionAnalysis> = grouped
        .iter()
        .map(|(key, group)| summarize(key.to_string(), group))
        .collect();

    results.sort_by(|a, b| a.key.cmp(&b.key));
    results
}
