//! Backtest Runner
//!
//! Replays historical samples through the full decision path: evaluate,
//! gate on tier, compute the market edge, size with fractional Kelly, and
//! route every stake through a fresh bankroll ledger so the backtest honors
//! the same exposure caps and drawdown halt as live operation.

use super::metrics::{calculate_metrics, BacktestMetrics};
use crate::config::LedgerConfig;
use crate::core::kelly::KellySizer;
use crate::ledger::{BankrollLedger, CannotBet};
use crate::models::{
    BetTicket, Context, ExternalSignals, FeatureVector, Odds, Outcome, Tier,
};
use crate::pipeline::Composer;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One historical decision point with its known settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalSample {
    pub id: String,
    pub sport: String,
    pub features: FeatureVector,
    #[serde(default)]
    pub opponent: Option<FeatureVector>,
    pub context: Context,
    #[serde(default)]
    pub signals: Option<ExternalSignals>,
    pub odds: Odds,
    pub outcome: Outcome,
}

/// Individual bet log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetLog {
    pub sample_id: String,
    pub sport: String,
    pub score: f64,
    pub confidence: f64,
    pub tier: Tier,
    pub edge: f64,
    pub decimal_odds: f64,
    pub implied_probability: f64,
    pub stake: f64,
    pub outcome: Outcome,
    pub won: bool,
    pub payout: f64,
    pub profit: f64,
    pub bankroll_after: f64,
}

/// Backtest result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub bets: Vec<BetLog>,
    pub total_samples: usize,
    pub skipped_below_tier: usize,
    pub skipped_no_stake: usize,
    pub skipped_halted: usize,
    pub skipped_invalid_odds: usize,
    pub total_stake: f64,
    pub total_payout: f64,
    pub final_bankroll: f64,
    pub halted: bool,
    pub metrics: Option<BacktestMetrics>,
}

impl BacktestResult {
    pub fn new(initial_bankroll: f64) -> Self {
        Self {
            bets: Vec::new(),
            total_samples: 0,
            skipped_below_tier: 0,
            skipped_no_stake: 0,
            skipped_halted: 0,
            skipped_invalid_odds: 0,
            total_stake: 0.0,
            total_payout: 0.0,
            final_bankroll: initial_bankroll,
            halted: false,
            metrics: None,
        }
    }

    pub fn total_profit(&self) -> f64 {
        self.bets.iter().map(|b| b.profit).sum()
    }

    pub fn roi(&self) -> f64 {
        if self.total_stake == 0.0 {
            0.0
        } else {
            self.total_profit() / self.total_stake
        }
    }

    pub fn finalize(&mut self) {
        self.metrics = Some(calculate_metrics(&self.bets, self.total_stake));
    }
}

/// Backtest runner configuration
#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub initial_bankroll: f64,
    pub fractional_kelly: f64,
    /// Minimum recommendation tier worth staking.
    pub min_tier: Tier,
    pub ledger: LedgerConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_bankroll: 10_000.0,
            fractional_kelly: 0.25,
            min_tier: Tier::Lean,
            ledger: LedgerConfig::default(),
        }
    }
}

/// Backtest runner
pub struct BacktestRunner {
    composer: Composer,
    sizer: KellySizer,
    config: BacktestConfig,
}

impl BacktestRunner {
    pub fn new(composer: Composer, config: BacktestConfig) -> Self {
        let sizer = KellySizer::new(config.fractional_kelly);
        Self {
            composer,
            sizer,
            config,
        }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Replay all samples in order against a fresh ledger.
    ///
    /// Each sample settles before the next is considered, so the ledger
    /// state (bankroll, loss streak, halt) evolves exactly as it would have
    /// at the time.
    pub fn run(&self, samples: &[HistoricalSample]) -> BacktestResult {
        let mut ledger =
            BankrollLedger::new(self.config.initial_bankroll, self.config.ledger.clone());
        let mut result = BacktestResult::new(self.config.initial_bankroll);
        let vig = self.composer.config().vig_percentage;

        for sample in samples {
            result.total_samples += 1;

            let rec = self.composer.evaluate(
                &sample.features,
                sample.opponent.as_ref(),
                &sample.context,
                sample.signals.as_ref(),
            );

            if rec.tier < self.config.min_tier {
                result.skipped_below_tier += 1;
                continue;
            }

            let decimal = match sample.odds.decimal() {
                Ok(d) => d,
                Err(e) => {
                    warn!(sample = %sample.id, error = %e, "skipping sample with bad odds");
                    result.skipped_invalid_odds += 1;
                    continue;
                }
            };
            let implied = (1.0 / decimal) * (1.0 - vig);

            // The model's win probability proxy against the de-vigged market
            // price.
            let edge = rec.score / 100.0 - implied;

            let fraction = match self.sizer.size(edge, &sample.odds, rec.confidence) {
                Ok(f) => f,
                Err(e) => {
                    warn!(sample = %sample.id, error = %e, "skipping sample with bad odds");
                    result.skipped_invalid_odds += 1;
                    continue;
                }
            };

            let quote = ledger.quote(fraction);
            if quote.stake <= 0.0 {
                match quote.reason {
                    Some(CannotBet::Halted) => result.skipped_halted += 1,
                    _ => result.skipped_no_stake += 1,
                }
                continue;
            }

            let ticket = BetTicket::new(&sample.id, quote.stake, sample.odds);
            if let Err(e) = ledger.allocate(ticket) {
                warn!(sample = %sample.id, error = %e, "allocation refused");
                result.skipped_no_stake += 1;
                continue;
            }

            let payout = match sample.outcome {
                Outcome::Win => quote.stake * decimal,
                _ => 0.0,
            };
            let report = match ledger.settle(&sample.id, sample.outcome, payout) {
                Ok(r) => r,
                Err(e) => {
                    // Unreachable after a successful allocate; logged rather
                    // than propagated so one bad sample cannot sink a run.
                    warn!(sample = %sample.id, error = %e, "settlement failed");
                    continue;
                }
            };

            result.total_stake += report.stake;
            result.total_payout += report.payout;
            result.bets.push(BetLog {
                sample_id: sample.id.clone(),
                sport: sample.sport.clone(),
                score: rec.score,
                confidence: rec.confidence,
                tier: rec.tier,
                edge,
                decimal_odds: decimal,
                implied_probability: implied,
                stake: report.stake,
                outcome: sample.outcome,
                won: sample.outcome == Outcome::Win,
                payout: report.payout,
                profit: report.profit,
                bankroll_after: report.bankroll_after,
            });
        }

        result.final_bankroll = ledger.current();
        result.halted = ledger.status() == crate::ledger::LedgerStatus::Halted;
        result.finalize();
        result
    }

    /// Print summary of backtest result
    pub fn print_summary(&self, result: &BacktestResult) {
        println!("\n{}", "=".repeat(60));
        println!("BACKTEST RESULTS");
        println!("{}", "=".repeat(60));
        println!("Initial bankroll: {:.2}", self.config.initial_bankroll);
        println!("Kelly fraction: {:.2}", self.config.fractional_kelly);
        println!("Minimum tier: {}", self.config.min_tier);
        println!("{}", "-".repeat(60));
        println!("Total samples: {}", result.total_samples);
        println!("Bets placed: {}", result.bets.len());
        println!("Skipped below tier: {}", result.skipped_below_tier);
        println!("Skipped no stake: {}", result.skipped_no_stake);
        println!("Skipped halted: {}", result.skipped_halted);
        println!("Skipped invalid odds: {}", result.skipped_invalid_odds);
        println!("{}", "-".repeat(60));
        println!("Total stake: {:.2}", result.total_stake);
        println!("Total payout: {:.2}", result.total_payout);
        println!("Total profit: {:.2}", result.total_profit());
        println!("ROI: {:.1}%", result.roi() * 100.0);
        println!("Final bankroll: {:.2}", result.final_bankroll);
        if result.halted {
            println!("Ledger HALTED by drawdown circuit breaker");
        }

        if let Some(ref metrics) = result.metrics {
            println!("{}", "-".repeat(60));
            println!("Hit rate: {:.1}%", metrics.hit_rate * 100.0);
            println!("Average edge: {:.3}", metrics.avg_edge);
            println!("Average odds: {:.2}", metrics.avg_odds);
            println!("Profit factor: {:.2}", metrics.profit_factor);
            println!("Max drawdown: {:.2}", metrics.max_drawdown);
        }

        println!("{}", "=".repeat(60));
    }
}
