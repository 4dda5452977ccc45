//! Calibration stages 1-3: base scoring, prior shrinkage, opponent edge.
//!
//! Stage 1 maps the feature vector through sport-specific correlation
//! weights into an initial score and confidence. Stage 2 shrinks the
//! harshness/memorability correlation ratio toward an external prior and
//! recomputes stage 1 with the adjusted weights. Stage 3 scores the opponent
//! the same way and converts the signed difference into a bet-size
//! multiplier and a confidence boost.

use crate::config::PipelineConfig;
use crate::models::{
    FeatureVector, FeatureWeights, ScoreState, FEATURE_HARSHNESS, FEATURE_LENGTH,
    FEATURE_MEMORABILITY, FEATURE_SYLLABLES,
};
use tracing::debug;

pub const STAGE_BASE: &str = "base";
pub const STAGE_PRIOR: &str = "prior_calibration";
pub const STAGE_OPPONENT: &str = "opponent_edge";

/// Score-unit spread of one weighted z-score.
const Z_SCALE: f64 = 20.0;
/// Sample size at which confidence reaches half its asymptotic value.
const CONFIDENCE_HALF_SAMPLE: f64 = 1000.0;
/// Cap on the opponent-edge bet-size multiplier.
const EDGE_MULTIPLIER_CAP: f64 = 2.0;
/// Cap on the opponent-edge confidence boost.
const EDGE_CONFIDENCE_CAP: f64 = 20.0;

/// Assumed population mean and standard deviation for a feature.
fn population_stats(feature: &str) -> (f64, f64) {
    match feature {
        FEATURE_SYLLABLES => (2.5, 1.0),
        FEATURE_LENGTH => (7.0, 2.0),
        FEATURE_HARSHNESS | FEATURE_MEMORABILITY => (50.0, 15.0),
        // Unknown features are assumed to be score-style (0-100).
        _ => (50.0, 15.0),
    }
}

/// Weighted z-score base computation shared by stages 1-3.
///
/// Returns `None` when no feature overlaps the weight table; callers decide
/// how to degrade.
pub(crate) fn compute_base(
    features: &FeatureVector,
    weights: &FeatureWeights,
) -> Option<(f64, f64)> {
    let mut weighted = 0.0;
    let mut abs_r = 0.0;
    let mut n_total = 0u64;
    let mut matched = 0usize;

    for (feature, weight) in weights {
        let value = match features.get(feature) {
            Some(v) => v,
            None => continue,
        };
        let (mean, std) = population_stats(feature);
        let z = (value - mean) / std;
        weighted += z * weight.r;
        abs_r += weight.r.abs();
        n_total += weight.n as u64;
        matched += 1;
    }

    if matched == 0 || abs_r == 0.0 {
        return None;
    }

    let score = 50.0 + Z_SCALE * (weighted / abs_r);
    let sample_factor = n_total as f64 / (n_total as f64 + CONFIDENCE_HALF_SAMPLE);
    let confidence = 100.0 * (abs_r / matched as f64) * sample_factor;

    Some((score, confidence))
}

/// Stage 1: initial score from feature deviations and correlation weights.
///
/// Fails closed to score 50 / confidence 0 when the sport has no usable
/// weights; "no signal" is a valid outcome, not an error.
pub fn stage_base(
    state: ScoreState,
    features: &FeatureVector,
    weights: Option<&FeatureWeights>,
) -> ScoreState {
    match weights.and_then(|w| compute_base(features, w)) {
        Some((score, confidence)) => state.replace_scores(
            STAGE_BASE,
            score,
            confidence,
            format!("weighted z-score base: {:.1} / {:.1}", score, confidence),
        ),
        None => {
            debug!("no correlation weights matched; failing closed to neutral score");
            state.replace_scores(
                STAGE_BASE,
                50.0,
                0.0,
                "no correlation weights for sport; neutral score".to_string(),
            )
        }
    }
}

/// Stage 2: Bayes-shrink the harshness/memorability correlation ratio toward
/// the configured prior, then recompute the base score with the adjusted
/// weights.
///
/// The shrink operates on a per-call copy of the weight table; the caller's
/// table is never touched, so repeated evaluations for the same sport cannot
/// compound the shrinkage. Returns the adjusted copy so stage 3 scores the
/// opponent with the same calibration.
pub fn stage_prior_calibration(
    state: ScoreState,
    features: &FeatureVector,
    weights: &FeatureWeights,
    config: &PipelineConfig,
) -> (ScoreState, FeatureWeights) {
    let (harsh, memorable) = match (
        weights.get(FEATURE_HARSHNESS),
        weights.get(FEATURE_MEMORABILITY),
    ) {
        (Some(h), Some(m)) if h.r.abs() > f64::EPSILON && m.r.abs() > f64::EPSILON => (*h, *m),
        _ => {
            let (score, confidence) = (state.score, state.confidence);
            let state = state.replace_scores(
                STAGE_PRIOR,
                score,
                confidence,
                "harshness/memorability weights unavailable; shrinkage skipped".to_string(),
            );
            return (state, weights.clone());
        }
    };

    let observed = harsh.r.abs() / memorable.r.abs();
    let n = harsh.n.min(memorable.n) as f64;
    let prior_weight = config.prior_weight as f64;
    let shrunk = (n * observed + prior_weight * config.prior_ratio) / (n + prior_weight);

    // Symmetric sqrt adjustment keeps the product of magnitudes fixed while
    // moving the ratio to the shrunk value; signs are preserved.
    let factor = (shrunk / observed).sqrt();
    let mut adjusted = weights.clone();
    if let Some(w) = adjusted.get_mut(FEATURE_HARSHNESS) {
        w.r *= factor;
    }
    if let Some(w) = adjusted.get_mut(FEATURE_MEMORABILITY) {
        w.r /= factor;
    }

    let (prev_score, prev_confidence) = (state.score, state.confidence);
    let state = match compute_base(features, &adjusted) {
        Some((score, confidence)) => state.replace_scores(
            STAGE_PRIOR,
            score,
            confidence,
            format!(
                "ratio {:.4} shrunk to {:.4} (n={}, prior {:.2})",
                observed, shrunk, n as u64, config.prior_ratio
            ),
        ),
        None => state.replace_scores(
            STAGE_PRIOR,
            prev_score,
            prev_confidence,
            "shrinkage left no scorable features".to_string(),
        ),
    };

    (state, adjusted)
}

/// Stage 3: opponent-relative edge.
///
/// Scores the opponent with the same calibrated weights, then converts the
/// edge magnitude into a bet-size multiplier `1 + min(|edge|/50, 1) * 0.5`
/// and a confidence boost of up to +20. No-op without opponent features.
pub fn stage_opponent_edge(
    state: ScoreState,
    opponent: Option<&FeatureVector>,
    weights: Option<&FeatureWeights>,
) -> ScoreState {
    let opponent = match opponent {
        Some(o) => o,
        None => {
            return state.apply_stage(
                STAGE_OPPONENT,
                1.0,
                0.0,
                "no opponent features supplied".to_string(),
            );
        }
    };

    let opponent_score = weights
        .and_then(|w| compute_base(opponent, w))
        .map(|(score, _)| ScoreState::clamp_score(score))
        .unwrap_or(50.0);

    let edge = state.score - opponent_score;
    let multiplier = (1.0 + (edge.abs() / 50.0).min(1.0) * 0.5).min(EDGE_MULTIPLIER_CAP);
    let boost = (edge.abs() / 2.0).min(EDGE_CONFIDENCE_CAP);

    state.apply_stage(
        STAGE_OPPONENT,
        multiplier,
        boost,
        format!("edge {:+.1} vs opponent score {:.1}", edge, opponent_score),
    )
}
