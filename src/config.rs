//! Configuration for the scoring pipeline, Kelly sizing and bankroll ledger.
//!
//! Every constant the pipeline relies on is externally overridable here and
//! loadable from a JSON file; nothing is process-wide mutable state.

use crate::models::{ContextTag, InteractionRule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// =============================================================================
// Defaults
// =============================================================================

fn default_vig_percentage() -> f64 {
    0.045
}

fn default_prior_ratio() -> f64 {
    1.05
}

fn default_prior_weight() -> u32 {
    10_000
}

fn default_fractional_kelly() -> f64 {
    0.25
}

fn default_max_bet_percentage() -> f64 {
    0.05
}

fn default_max_simultaneous_exposure() -> f64 {
    0.25
}

fn default_drawdown_halt_threshold() -> f64 {
    0.20
}

fn default_consecutive_loss_threshold() -> u32 {
    10
}

/// Per-tag amplification applied by the context stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextBoost {
    pub multiplier: f64,
    pub confidence_boost: f64,
}

fn default_context_table() -> BTreeMap<ContextTag, ContextBoost> {
    use ContextTag::*;
    [
        (Primetime, 1.25, 8.0),
        (Playoff, 1.40, 10.0),
        (Rivalry, 1.20, 5.0),
        (NationalBroadcast, 1.15, 5.0),
        (HomeGame, 1.10, 3.0),
        (ContractYear, 1.20, 5.0),
        (RookieSeason, 1.15, 4.0),
        (Breakout, 1.30, 8.0),
        (Championship, 1.50, 12.0),
    ]
    .into_iter()
    .map(|(tag, multiplier, confidence_boost)| {
        (
            tag,
            ContextBoost {
                multiplier,
                confidence_boost,
            },
        )
    })
    .collect()
}

fn default_interaction_table() -> BTreeMap<InteractionRule, f64> {
    use InteractionRule::*;
    [
        (HarshAndShort, 1.30),
        (MemorableAndPrimetime, 1.50),
        (HarshAndRivalry, 1.20),
        (ShortAndMemorable, 1.25),
        (LongAndForgettable, 0.85),
        (HarshAndChampionship, 1.35),
    ]
    .into_iter()
    .collect()
}

// =============================================================================
// Configuration types
// =============================================================================

/// Constants governing the seven calibration stages and odds math.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Flat vig fraction removed from implied probabilities. A documented
    /// approximation, not a proportional two-sided de-vig.
    #[serde(default = "default_vig_percentage")]
    pub vig_percentage: f64,
    /// External prior for the harshness/memorability correlation ratio.
    #[serde(default = "default_prior_ratio")]
    pub prior_ratio: f64,
    /// Pseudo-sample size backing the prior ratio.
    #[serde(default = "default_prior_weight")]
    pub prior_weight: u32,
    /// Per-tag multiplier and confidence boost for the context stage.
    #[serde(default = "default_context_table")]
    pub context_table: BTreeMap<ContextTag, ContextBoost>,
    /// Multiplier per interaction rule for the final stage.
    #[serde(default = "default_interaction_table")]
    pub interaction_table: BTreeMap<InteractionRule, f64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            vig_percentage: default_vig_percentage(),
            prior_ratio: default_prior_ratio(),
            prior_weight: default_prior_weight(),
            context_table: default_context_table(),
            interaction_table: default_interaction_table(),
        }
    }
}

/// Kelly sizing constants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KellyConfig {
    /// Fraction of full Kelly to stake (0.25 = quarter Kelly).
    #[serde(default = "default_fractional_kelly")]
    pub fractional: f64,
}

impl Default for KellyConfig {
    fn default() -> Self {
        Self {
            fractional: default_fractional_kelly(),
        }
    }
}

/// Bankroll ledger risk limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Maximum single stake as a fraction of the current bankroll.
    #[serde(default = "default_max_bet_percentage")]
    pub max_bet_percentage: f64,
    /// Maximum fraction of the bankroll allowed in outstanding bets.
    #[serde(default = "default_max_simultaneous_exposure")]
    pub max_simultaneous_exposure: f64,
    /// Drawdown from peak at which the ledger halts.
    #[serde(default = "default_drawdown_halt_threshold")]
    pub drawdown_halt_threshold: f64,
    /// Consecutive losses after which quotes are halved.
    #[serde(default = "default_consecutive_loss_threshold")]
    pub consecutive_loss_threshold: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_bet_percentage: default_max_bet_percentage(),
            max_simultaneous_exposure: default_max_simultaneous_exposure(),
            drawdown_halt_threshold: default_drawdown_halt_threshold(),
            consecutive_loss_threshold: default_consecutive_loss_threshold(),
        }
    }
}

/// Root configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub kelly: KellyConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents = fs::read_to_string(&path)
            .map_err(|e| format!("failed to read config file: {}", e))?;
        Self::from_json(&contents)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(s: &str) -> Result<Self, String> {
        serde_json::from_str(s).map_err(|e| format!("failed to parse config: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert!((cfg.pipeline.vig_percentage - 0.045).abs() < 1e-9);
        assert!((cfg.kelly.fractional - 0.25).abs() < 1e-9);
        assert!((cfg.ledger.max_bet_percentage - 0.05).abs() < 1e-9);
        assert!((cfg.ledger.max_simultaneous_exposure - 0.25).abs() < 1e-9);
        assert!((cfg.ledger.drawdown_halt_threshold - 0.20).abs() < 1e-9);
        assert_eq!(cfg.ledger.consecutive_loss_threshold, 10);
    }

    #[test]
    fn test_default_context_table() {
        let table = default_context_table();
        let playoff = table.get(&ContextTag::Playoff).unwrap();
        assert!((playoff.multiplier - 1.40).abs() < 1e-9);
        assert!((playoff.confidence_boost - 10.0).abs() < 1e-9);
        assert_eq!(table.len(), 9);
    }

    #[test]
    fn test_from_json_partial_override() {
        let cfg = Config::from_json(
            r#"{"ledger": {"max_bet_percentage": 0.02}, "kelly": {"fractional": 0.5}}"#,
        )
        .unwrap();
        assert!((cfg.ledger.max_bet_percentage - 0.02).abs() < 1e-9);
        // Unspecified fields fall back to defaults.
        assert!((cfg.ledger.max_simultaneous_exposure - 0.25).abs() < 1e-9);
        assert!((cfg.kelly.fractional - 0.5).abs() < 1e-9);
        assert!((cfg.pipeline.vig_percentage - 0.045).abs() < 1e-9);
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(Config::from_json("not json").is_err());
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let cfg = Config::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back = Config::from_json(&json).unwrap();
        assert_eq!(
            back.ledger.consecutive_loss_threshold,
            cfg.ledger.consecutive_loss_threshold
        );
        assert_eq!(back.pipeline.context_table.len(), 9);
    }
}
