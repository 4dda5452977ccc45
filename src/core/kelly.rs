//! Kelly Criterion Bet Sizing
//!
//! Converts an edge, odds and a confidence into a fraction of bankroll via
//! fractional Kelly:
//!
//! ```text
//! f = edge / (decimal_odds - 1)
//! ```
//!
//! scaled by the fractional multiplier (quarter Kelly by default, a
//! deliberate safety reduction from full Kelly) and by confidence / 100.
//! The result is a fraction, never a dollar amount; dollar conversion and
//! the absolute caps belong to the bankroll ledger.

use crate::config::KellyConfig;
use crate::error::OddsError;
use crate::models::Odds;
use serde::{Deserialize, Serialize};

/// Full Kelly fraction for a given edge and decimal odds.
///
/// Returns 0 (never negative) when there is no edge or no payout.
///
/// # Examples
/// ```
/// use edgerank::core::kelly::kelly_fraction;
/// let k = kelly_fraction(0.05, 1.909);
/// assert!((k - 0.055).abs() < 0.001);
/// assert_eq!(kelly_fraction(-0.05, 1.909), 0.0);
/// ```
pub fn kelly_fraction(edge: f64, decimal_odds: f64) -> f64 {
    if edge <= 0.0 || decimal_odds <= 1.0 {
        return 0.0;
    }

    edge / (decimal_odds - 1.0)
}

/// Breakdown of one sizing decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetSize {
    pub edge: f64,
    pub decimal_odds: f64,
    pub confidence: f64,
    /// Full Kelly fraction before any scaling.
    pub kelly_fraction: f64,
    /// Final fraction of bankroll after fractional and confidence scaling.
    pub fraction: f64,
}

/// Fractional-Kelly bet sizer. Stateless and independent of the ledger.
#[derive(Debug, Clone, Copy)]
pub struct KellySizer {
    fractional: f64,
}

impl KellySizer {
    /// Create a sizer with an explicit Kelly fraction (0.25 = quarter Kelly).
    pub fn new(fractional: f64) -> Self {
        Self { fractional }
    }

    pub fn from_config(config: KellyConfig) -> Self {
        Self::new(config.fractional)
    }

    pub fn fractional(&self) -> f64 {
        self.fractional
    }

    /// Fraction of bankroll to stake for a given edge, odds and confidence
    /// (confidence on a 0-100 scale, saturated silently).
    pub fn size(&self, edge: f64, odds: &Odds, confidence: f64) -> Result<f64, OddsError> {
        Ok(self.size_detailed(edge, odds, confidence)?.fraction)
    }

    /// Like [`size`](Self::size) but returns the full breakdown.
    pub fn size_detailed(
        &self,
        edge: f64,
        odds: &Odds,
        confidence: f64,
    ) -> Result<BetSize, OddsError> {
        let decimal_odds = odds.decimal()?;
        let confidence = confidence.clamp(0.0, 100.0);
        let kelly = kelly_fraction(edge, decimal_odds);
        let fraction = (kelly * self.fractional * confidence / 100.0).max(0.0);

        Ok(BetSize {
            edge,
            decimal_odds,
            confidence,
            kelly_fraction: kelly,
            fraction,
        })
    }
}

impl Default for KellySizer {
    fn default() -> Self {
        Self::from_config(KellyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kelly_fraction_positive_edge() {
        let k = kelly_fraction(0.05, 1.909);
        assert!((k - 0.05501).abs() < 0.001);
    }

    #[test]
    fn test_kelly_fraction_no_edge() {
        assert_eq!(kelly_fraction(0.0, 2.0), 0.0);
        assert_eq!(kelly_fraction(-0.10, 2.0), 0.0);
    }

    #[test]
    fn test_kelly_fraction_no_payout() {
        assert_eq!(kelly_fraction(0.10, 1.0), 0.0);
        assert_eq!(kelly_fraction(0.10, 0.5), 0.0);
    }

    #[test]
    fn test_size_scenario_quarter_kelly() {
        // edge 0.05, American -110 (decimal 1.909), confidence 75:
        // 0.05 / 0.909 = 0.055, x0.25 x0.75 = 0.0103
        let sizer = KellySizer::default();
        let fraction = sizer.size(0.05, &Odds::American(-110), 75.0).unwrap();
        assert!((fraction - 0.0103).abs() < 0.0005, "got {}", fraction);
    }

    #[test]
    fn test_size_never_negative() {
        let sizer = KellySizer::default();
        assert_eq!(sizer.size(-0.20, &Odds::American(-110), 90.0).unwrap(), 0.0);
        assert_eq!(sizer.size(0.05, &Odds::Decimal(1.0), 90.0).unwrap(), 0.0);
    }

    #[test]
    fn test_size_confidence_scaling() {
        let sizer = KellySizer::new(0.5);
        let full = sizer.size(0.10, &Odds::Decimal(3.0), 100.0).unwrap();
        let half = sizer.size(0.10, &Odds::Decimal(3.0), 50.0).unwrap();
        assert!((half - full / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_size_confidence_saturates() {
        let sizer = KellySizer::default();
        let capped = sizer.size(0.10, &Odds::Decimal(3.0), 250.0).unwrap();
        let at_max = sizer.size(0.10, &Odds::Decimal(3.0), 100.0).unwrap();
        assert!((capped - at_max).abs() < 1e-9);
    }

    #[test]
    fn test_size_invalid_odds() {
        let sizer = KellySizer::default();
        assert!(sizer.size(0.05, &Odds::American(50), 75.0).is_err());
    }

    #[test]
    fn test_size_detailed_fields() {
        let sizer = KellySizer::default();
        let detail = sizer
            .size_detailed(0.05, &Odds::American(-110), 75.0)
            .unwrap();
        assert!((detail.decimal_odds - 1.909).abs() < 0.001);
        assert!((detail.kelly_fraction - 0.055).abs() < 0.001);
        assert!(detail.fraction < detail.kelly_fraction);
    }
}
