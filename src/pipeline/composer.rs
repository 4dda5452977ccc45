//! Pipeline Composer
//!
//! Runs the seven calibration stages in their fixed order, threads the
//! score state through them, and converts the final state into a
//! recommendation tier. Side-effect free: a composer holds only immutable
//! configuration, so concurrent and repeated evaluation of the same inputs
//! always produces the same recommendation.

use crate::config::PipelineConfig;
use crate::models::{
    Context, CorrelationTable, ExternalSignals, FeatureVector, Recommendation, ScoreState, Tier,
};
use crate::pipeline::adjust::{stage_buzz, stage_context, stage_interactions, stage_market};
use crate::pipeline::base::{stage_base, stage_opponent_edge, stage_prior_calibration};
use tracing::debug;

/// Map a final score and confidence onto the five recommendation tiers.
fn classify_tier(score: f64, confidence: f64) -> Tier {
    if score >= 80.0 && confidence >= 60.0 {
        Tier::StrongBet
    } else if score >= 70.0 && confidence >= 50.0 {
        Tier::ConfidentBet
    } else if score >= 60.0 && confidence >= 40.0 {
        Tier::Bet
    } else if score >= 55.0 && confidence >= 25.0 {
        Tier::Lean
    } else {
        Tier::Pass
    }
}

/// Orders the seven calibration stages and produces recommendations.
#[derive(Debug, Clone)]
pub struct Composer {
    correlations: CorrelationTable,
    config: PipelineConfig,
}

impl Composer {
    pub fn new(correlations: CorrelationTable, config: PipelineConfig) -> Self {
        Self {
            correlations,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn correlations(&self) -> &CorrelationTable {
        &self.correlations
    }

    /// Evaluate one subject through all seven stages.
    ///
    /// A sport with no correlation weights degrades to a conservative
    /// neutral base (score 50, confidence 0) and the later stages still run;
    /// the result is a valid "no edge" recommendation, never an error.
    pub fn evaluate(
        &self,
        features: &FeatureVector,
        opponent: Option<&FeatureVector>,
        context: &Context,
        signals: Option<&ExternalSignals>,
    ) -> Recommendation {
        let weights = self.correlations.for_sport(&context.sport);

        // Stages 1-3 share the sport's correlation weights; stage 2 hands its
        // calibrated per-call copy to stage 3 so the opponent is scored with
        // the same adjustment.
        let state = stage_base(ScoreState::neutral(), features, weights);
        let (state, calibrated) = match weights {
            Some(w) => {
                let (state, calibrated) =
                    stage_prior_calibration(state, features, w, &self.config);
                (state, Some(calibrated))
            }
            None => {
                let (score, confidence) = (state.score, state.confidence);
                let state = state.replace_scores(
                    crate::pipeline::base::STAGE_PRIOR,
                    score,
                    confidence,
                    "no weights to calibrate".to_string(),
                );
                (state, None)
            }
        };
        let state = stage_opponent_edge(state, opponent, calibrated.as_ref());

        // Stages 4-7.
        let state = stage_context(state, context, &self.config);
        let state = stage_buzz(state, signals);
        let state = stage_market(state, signals);
        let state = stage_interactions(state, features, context, &self.config);

        let tier = classify_tier(state.score, state.confidence);
        debug!(
            sport = %context.sport,
            score = state.score,
            confidence = state.confidence,
            multiplier = state.cumulative_multiplier,
            tier = %tier,
            "pipeline evaluation complete"
        );

        Recommendation {
            score: state.score,
            confidence: state.confidence,
            cumulative_multiplier: state.cumulative_multiplier,
            tier,
            trace: state.trace,
        }
    }
}
