//! Backtesting engine for validating the decision pipeline

pub mod metrics;
pub mod simulator;
pub mod synthetic;

pub use metrics::{calculate_metrics, calculate_sharpe_ratio, BacktestMetrics};
pub use simulator::{BacktestConfig, BacktestResult, BacktestRunner, BetLog, HistoricalSample};
pub use synthetic::SyntheticSampleGenerator;
