//! Edgerank - Betting decision pipeline
//!
//! This library provides:
//! - Seven-stage score calibration from feature correlations to a final
//!   recommendation with a full per-stage audit trail
//! - American and decimal odds conversion with vig-adjusted implied
//!   probabilities
//! - Fractional Kelly bet sizing
//! - A bankroll ledger with exposure caps and a drawdown circuit breaker
//! - A backtest runner that replays historical samples through the whole
//!   decision path
//!
//! # Example
//!
//! ```
//! use edgerank::config::PipelineConfig;
//! use edgerank::models::{Context, ContextTag, CorrelationTable, FeatureVector};
//! use edgerank::pipeline::Composer;
//!
//! let mut correlations = CorrelationTable::new();
//! correlations.insert("nba", "harshness", 0.427, 2000);
//! correlations.insert("nba", "syllables", -0.418, 2000);
//!
//! let composer = Composer::new(correlations, PipelineConfig::default());
//!
//! let features = FeatureVector::new()
//!     .with("harshness", 78.0)
//!     .with("syllables", 2.0);
//! let context = Context::new("nba").with_tag(ContextTag::Playoff);
//!
//! let rec = composer.evaluate(&features, None, &context, None);
//! println!("{}: score {:.1}", rec.tier_label(), rec.score);
//! ```

pub mod backtesting;
pub mod config;
pub mod core;
pub mod error;
pub mod ledger;
pub mod models;
pub mod pipeline;

// Re-export commonly used types
pub use backtesting::{BacktestConfig, BacktestResult, BacktestRunner, HistoricalSample};
pub use config::Config;
pub use core::{implied_probability, kelly_fraction, KellySizer};
pub use error::{LedgerError, OddsError};
pub use ledger::{BankrollLedger, Quote, SettlementReport, SharedLedger};
pub use models::{
    Context, ContextTag, CorrelationTable, ExternalSignals, FeatureVector, Odds, Outcome,
    Recommendation, Tier,
};
pub use pipeline::{Composer, MarketSignal};
