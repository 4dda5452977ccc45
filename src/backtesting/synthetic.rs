//! Synthetic Sample Generation
//!
//! Generate realistic historical samples for backtesting when real data is
//! unavailable. A hidden strength variable drives both the features and the
//! outcome, so the pipeline has a real signal to find, while a bookmaker
//! margin on the quoted odds keeps the market beatable but not free.

use super::simulator::HistoricalSample;
use crate::models::{
    Context, ContextTag, CorrelationTable, ExternalSignals, FeatureVector, Odds, Outcome,
    FEATURE_HARSHNESS, FEATURE_LENGTH, FEATURE_MEMORABILITY, FEATURE_SYLLABLES,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Sport label under which all synthetic samples are generated.
pub const SYNTHETIC_SPORT: &str = "synthetic";

/// How strongly the hidden strength moves the win probability.
const STRENGTH_TO_PROB: f64 = 0.6;

/// Fraction of samples that settle as a push.
const PUSH_RATE: f64 = 0.02;

/// Synthetic sample generator. Deterministic for a given seed.
pub struct SyntheticSampleGenerator {
    rng: StdRng,
    /// Bookmaker margin applied on top of fair odds.
    margin: f64,
}

impl SyntheticSampleGenerator {
    pub fn new(seed: u64, margin: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            margin,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(seed, 0.045)
    }

    /// Correlation weights consistent with how the features are generated.
    /// Feed these to the composer so scores track the hidden strength.
    pub fn correlations() -> CorrelationTable {
        let mut table = CorrelationTable::new();
        table.insert(SYNTHETIC_SPORT, FEATURE_HARSHNESS, 0.40, 5000);
        table.insert(SYNTHETIC_SPORT, FEATURE_MEMORABILITY, 0.35, 5000);
        table.insert(SYNTHETIC_SPORT, FEATURE_SYLLABLES, -0.40, 5000);
        table.insert(SYNTHETIC_SPORT, FEATURE_LENGTH, -0.20, 5000);
        table
    }

    /// Standard normal draw via Box-Muller.
    fn normal(&mut self) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen_range(0.0..1.0);
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }

    /// Generate one sample with id `synthetic-{index}`.
    pub fn generate_one(&mut self, index: usize) -> HistoricalSample {
        // Features are a noisy function of a single hidden strength, with
        // signs matching the correlation table above.
        let strength = self.normal();

        let harshness = (50.0 + 15.0 * (0.7 * strength + 0.3 * self.normal())).clamp(0.0, 100.0);
        let memorability =
            (50.0 + 15.0 * (0.6 * strength + 0.4 * self.normal())).clamp(0.0, 100.0);
        let syllables = (2.5 - 0.5 * strength + 0.4 * self.normal())
            .round()
            .clamp(1.0, 6.0);
        let length = (7.0 - 1.2 * strength + 1.0 * self.normal())
            .round()
            .clamp(3.0, 14.0);

        let features = FeatureVector::new()
            .with(FEATURE_HARSHNESS, harshness)
            .with(FEATURE_MEMORABILITY, memorability)
            .with(FEATURE_SYLLABLES, syllables)
            .with(FEATURE_LENGTH, length);

        let win_prob = 1.0 / (1.0 + (-STRENGTH_TO_PROB * strength).exp());
        let win_prob = win_prob.clamp(0.15, 0.85);

        // Quoted decimal odds shade the fair price by the margin.
        let decimal = ((1.0 / win_prob) * (1.0 - self.margin)).max(1.01);
        let decimal = (decimal * 100.0).round() / 100.0;

        let mut context = Context::new(SYNTHETIC_SPORT);
        if self.rng.gen_bool(0.20) {
            context = context.with_tag(ContextTag::Primetime);
        }
        if self.rng.gen_bool(0.15) {
            context = context.with_tag(ContextTag::Rivalry);
        }

        let signals = ExternalSignals {
            buzz_score: if self.rng.gen_bool(0.5) {
                Some(self.rng.gen_range(0.0..100.0))
            } else {
                None
            },
            public_percentage: if self.rng.gen_bool(0.5) {
                Some(self.rng.gen_range(0.2..0.8))
            } else {
                None
            },
        };

        let outcome = if self.rng.gen_bool(PUSH_RATE) {
            Outcome::Push
        } else if self.rng.gen_bool(win_prob) {
            Outcome::Win
        } else {
            Outcome::Loss
        };

        HistoricalSample {
            id: format!("synthetic-{}", index),
            sport: SYNTHETIC_SPORT.to_string(),
            features,
            opponent: None,
            context,
            signals: Some(signals),
            odds: Odds::Decimal(decimal),
            outcome,
        }
    }

    /// Generate a batch of samples.
    pub fn generate(&mut self, count: usize) -> Vec<HistoricalSample> {
        (0..count).map(|i| self.generate_one(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_for_seed() {
        let a = SyntheticSampleGenerator::with_seed(99).generate(20);
        let b = SyntheticSampleGenerator::with_seed(99).generate(20);

        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.outcome, y.outcome);
            assert_eq!(
                x.features.get(FEATURE_HARSHNESS),
                y.features.get(FEATURE_HARSHNESS)
            );
        }
    }

    #[test]
    fn test_seeds_differ() {
        let a = SyntheticSampleGenerator::with_seed(1).generate(50);
        let b = SyntheticSampleGenerator::with_seed(2).generate(50);
        let same = a.iter().zip(&b).filter(|(x, y)| x.outcome == y.outcome).count();
        assert!(same < 50);
    }

    #[test]
    fn test_features_in_range() {
        let samples = SyntheticSampleGenerator::with_seed(7).generate(200);

        for sample in &samples {
            let h = sample.features.get(FEATURE_HARSHNESS).unwrap();
            let s = sample.features.get(FEATURE_SYLLABLES).unwrap();
            let l = sample.features.get(FEATURE_LENGTH).unwrap();
            assert!((0.0..=100.0).contains(&h));
            assert!((1.0..=6.0).contains(&s));
            assert!((3.0..=14.0).contains(&l));
            assert_eq!(s, s.round());
        }
    }

    #[test]
    fn test_odds_valid_and_margined() {
        let samples = SyntheticSampleGenerator::with_seed(13).generate(200);

        for sample in &samples {
            let decimal = sample.odds.decimal().unwrap();
            assert!(decimal >= 1.01);
            // Margin caps fair odds: 0.85 win prob floor gives ~1.12 minimum.
            assert!(decimal < 8.0, "decimal {} out of range", decimal);
        }
    }

    #[test]
    fn test_ids_sequential() {
        let samples = SyntheticSampleGenerator::with_seed(5).generate(3);
        assert_eq!(samples[0].id, "synthetic-0");
        assert_eq!(samples[2].id, "synthetic-2");
    }

    #[test]
    fn test_hit_rate_roughly_balanced() {
        // Strength is symmetric around zero so wins and losses should both
        // appear in bulk.
        let samples = SyntheticSampleGenerator::with_seed(21).generate(1000);
        let wins = samples.iter().filter(|s| s.outcome == Outcome::Win).count();
        assert!(wins > 300 && wins < 700, "wins = {}", wins);
    }

    #[test]
    fn test_correlations_cover_generated_features() {
        let table = SyntheticSampleGenerator::correlations();
        let weights = table.for_sport(SYNTHETIC_SPORT).unwrap();
        for feature in [
            FEATURE_HARSHNESS,
            FEATURE_MEMORABILITY,
            FEATURE_SYLLABLES,
            FEATURE_LENGTH,
        ] {
            assert!(weights.contains_key(feature));
        }
    }
}
