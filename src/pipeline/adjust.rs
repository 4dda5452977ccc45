//! Calibration stages 4-7: context amplification, buzz, market signal and
//! interaction effects.
//!
//! Each stage reads a fixed lookup table (overridable through
//! [`PipelineConfig`]) and contributes a multiplier to the running score.
//! Matched multipliers within a stage multiply together and are capped at
//! the stage's own ceiling; the cumulative product across stages is never
//! re-capped.

use crate::config::PipelineConfig;
use crate::models::{
    Context, ContextTag, ExternalSignals, FeatureVector, InteractionRule, ScoreState,
    FEATURE_HARSHNESS, FEATURE_LENGTH, FEATURE_MEMORABILITY, FEATURE_SYLLABLES,
};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const STAGE_CONTEXT: &str = "context";
pub const STAGE_BUZZ: &str = "buzz";
pub const STAGE_MARKET: &str = "market";
pub const STAGE_INTERACTIONS: &str = "interactions";

/// Cap on the combined context multiplier.
const CONTEXT_MULTIPLIER_CAP: f64 = 3.0;
/// Cap on the combined interaction multiplier.
const INTERACTION_MULTIPLIER_CAP: f64 = 2.5;
/// Buzz log scaling weight.
const BUZZ_WEIGHT: f64 = 0.3;

/// Stage 4: multiply together the amplifiers of every matched context tag
/// (product capped at 3.0) and sum their confidence boosts.
pub fn stage_context(state: ScoreState, context: &Context, config: &PipelineConfig) -> ScoreState {
    let mut multiplier = 1.0;
    let mut boost = 0.0;
    let mut matched: Vec<ContextTag> = Vec::new();

    for tag in &context.tags {
        if let Some(amp) = config.context_table.get(tag) {
            multiplier *= amp.multiplier;
            boost += amp.confidence_boost;
            matched.push(*tag);
        }
    }

    multiplier = multiplier.min(CONTEXT_MULTIPLIER_CAP);

    let rationale = if matched.is_empty() {
        "no context tags matched".to_string()
    } else {
        let names: Vec<String> = matched.iter().map(|t| t.to_string()).collect();
        format!("contexts: {}", names.join(", "))
    };

    state.apply_stage(STAGE_CONTEXT, multiplier, boost, rationale)
}

/// Stage 5: exogenous attention adjustment, `1 + 0.3 * ln(buzz + 1) / 10`.
/// No-op without a buzz value; out-of-range buzz saturates to [0, 100].
pub fn stage_buzz(state: ScoreState, signals: Option<&ExternalSignals>) -> ScoreState {
    let buzz = match signals.and_then(|s| s.buzz_score) {
        Some(b) => b.clamp(0.0, 100.0),
        None => {
            return state.apply_stage(STAGE_BUZZ, 1.0, 0.0, "no buzz signal".to_string());
        }
    };

    let multiplier = 1.0 + BUZZ_WEIGHT * (buzz + 1.0).ln() / 10.0;
    state.apply_stage(
        STAGE_BUZZ,
        multiplier,
        0.0,
        format!("buzz {:.0}", buzz),
    )
}

/// Market-inefficiency classification from score versus public betting
/// percentage. Closed set; adding a signal is a compile-time change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketSignal {
    StrongContrarian,
    FadePublic,
    ValuePlay,
    PublicTrap,
    NoEdge,
}

impl MarketSignal {
    /// Classify a score against the public percentage.
    ///
    /// High-score branches are checked before the value branch so a score
    /// that qualifies for both resolves to the stronger signal.
    pub fn classify(score: f64, public_percentage: f64) -> Self {
        let p = public_percentage.clamp(0.0, 1.0);
        if score >= 65.0 && p < 0.40 {
            MarketSignal::StrongContrarian
        } else if score >= 65.0 && p > 0.70 {
            MarketSignal::PublicTrap
        } else if score <= 45.0 && p > 0.65 {
            MarketSignal::FadePublic
        } else if score >= 55.0 && p < 0.50 {
            MarketSignal::ValuePlay
        } else {
            MarketSignal::NoEdge
        }
    }

    /// Score multiplier for this signal.
    pub fn multiplier(&self) -> f64 {
        match self {
            MarketSignal::StrongContrarian => 2.0,
            MarketSignal::PublicTrap => 0.5,
            MarketSignal::FadePublic => 0.75,
            MarketSignal::ValuePlay => 1.5,
            MarketSignal::NoEdge => 1.0,
        }
    }
}

impl fmt::Display for MarketSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MarketSignal::StrongContrarian => "STRONG_CONTRARIAN",
            MarketSignal::FadePublic => "FADE_PUBLIC",
            MarketSignal::ValuePlay => "VALUE_PLAY",
            MarketSignal::PublicTrap => "PUBLIC_TRAP",
            MarketSignal::NoEdge => "NO_EDGE",
        };
        write!(f, "{}", name)
    }
}

/// Stage 6: apply the matched market signal's multiplier. No-op without a
/// public betting percentage.
pub fn stage_market(state: ScoreState, signals: Option<&ExternalSignals>) -> ScoreState {
    let p = match signals.and_then(|s| s.public_percentage) {
        Some(p) => p,
        None => {
            return state.apply_stage(STAGE_MARKET, 1.0, 0.0, "no public percentage".to_string());
        }
    };

    let signal = MarketSignal::classify(state.score, p);
    state.apply_stage(
        STAGE_MARKET,
        signal.multiplier(),
        0.0,
        format!("{} at public {:.0}%", signal, p.clamp(0.0, 1.0) * 100.0),
    )
}

impl InteractionRule {
    /// Whether this rule's two-feature condition holds.
    pub fn holds(&self, features: &FeatureVector, context: &Context) -> bool {
        let harshness = features.get(FEATURE_HARSHNESS).unwrap_or(50.0);
        let memorability = features.get(FEATURE_MEMORABILITY).unwrap_or(50.0);
        let syllables = features.get(FEATURE_SYLLABLES).unwrap_or(3.0);
        let length = features.get(FEATURE_LENGTH).unwrap_or(7.0);

        match self {
            InteractionRule::HarshAndShort => harshness >= 65.0 && syllables <= 2.0,
            InteractionRule::MemorableAndPrimetime => {
                memorability >= 65.0 && context.has_tag(ContextTag::Primetime)
            }
            InteractionRule::HarshAndRivalry => {
                harshness >= 65.0 && context.has_tag(ContextTag::Rivalry)
            }
            InteractionRule::ShortAndMemorable => syllables <= 2.0 && memorability >= 65.0,
            InteractionRule::LongAndForgettable => length >= 10.0 && memorability <= 35.0,
            InteractionRule::HarshAndChampionship => {
                harshness >= 70.0 && context.has_tag(ContextTag::Championship)
            }
        }
    }
}

/// Stage 7: multiply together the multiplier of every interaction rule whose
/// condition holds, capped at 2.5.
pub fn stage_interactions(
    state: ScoreState,
    features: &FeatureVector,
    context: &Context,
    config: &PipelineConfig,
) -> ScoreState {
    let mut multiplier = 1.0;
    let mut matched: Vec<InteractionRule> = Vec::new();

    for (rule, m) in &config.interaction_table {
        if rule.holds(features, context) {
            multiplier *= m;
            matched.push(*rule);
        }
    }

    multiplier = multiplier.min(INTERACTION_MULTIPLIER_CAP);

    let rationale = if matched.is_empty() {
        "no interaction rules matched".to_string()
    } else {
        let names: Vec<String> = matched.iter().map(|r| r.to_string()).collect();
        format!("interactions: {}", names.join(", "))
    };

    state.apply_stage(STAGE_INTERACTIONS, multiplier, 0.0, rationale)
}
