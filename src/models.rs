use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Upper bound for pipeline scores.
pub const SCORE_CEILING: f64 = 100.0;
/// Upper bound for pipeline confidence.
pub const CONFIDENCE_CEILING: f64 = 95.0;

/// Well-known feature names produced by the linguistic collaborator layer.
pub const FEATURE_SYLLABLES: &str = "syllables";
pub const FEATURE_HARSHNESS: &str = "harshness";
pub const FEATURE_MEMORABILITY: &str = "memorability";
pub const FEATURE_LENGTH: &str = "length";

/// Per-subject numeric attributes, keyed by feature name.
///
/// Score-style features (harshness, memorability) are on a roughly 0-100
/// scale; counts (syllables, length) are small positive numbers. The pipeline
/// treats all values as opaque inputs and never computes them itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(BTreeMap<String, f64>);

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }

    pub fn insert(&mut self, name: &str, value: f64) {
        self.0.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }
}

/// Situational context tag detected from the matchup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextTag {
    Primetime,
    Playoff,
    Rivalry,
    NationalBroadcast,
    HomeGame,
    ContractYear,
    RookieSeason,
    Breakout,
    Championship,
}

impl fmt::Display for ContextTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContextTag::Primetime => "primetime",
            ContextTag::Playoff => "playoff",
            ContextTag::Rivalry => "rivalry",
            ContextTag::NationalBroadcast => "national_broadcast",
            ContextTag::HomeGame => "home_game",
            ContextTag::ContractYear => "contract_year",
            ContextTag::RookieSeason => "rookie_season",
            ContextTag::Breakout => "breakout",
            ContextTag::Championship => "championship",
        };
        write!(f, "{}", name)
    }
}

/// Two-feature interaction rules evaluated by the final calibration stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionRule {
    HarshAndShort,
    MemorableAndPrimetime,
    HarshAndRivalry,
    ShortAndMemorable,
    LongAndForgettable,
    HarshAndChampionship,
}

impl fmt::Display for InteractionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InteractionRule::HarshAndShort => "harsh_and_short",
            InteractionRule::MemorableAndPrimetime => "memorable_and_primetime",
            InteractionRule::HarshAndRivalry => "harsh_and_rivalry",
            InteractionRule::ShortAndMemorable => "short_and_memorable",
            InteractionRule::LongAndForgettable => "long_and_forgettable",
            InteractionRule::HarshAndChampionship => "harsh_and_championship",
        };
        write!(f, "{}", name)
    }
}

fn default_market_size() -> f64 {
    1.0
}

/// Situational facts about a single decision. Constructed once, immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    /// Sport or category key used to select correlation weights.
    pub sport: String,
    /// Matched situational tags.
    #[serde(default)]
    pub tags: BTreeSet<ContextTag>,
    /// Market-size multiplier (1.0 = average market).
    #[serde(default = "default_market_size")]
    pub market_size: f64,
    /// Signed strength differential versus the opponent, if known.
    #[serde(default)]
    pub opponent_differential: f64,
    /// Stakes score in [0, 1].
    #[serde(default)]
    pub stakes: f64,
}

impl Context {
    pub fn new(sport: &str) -> Self {
        Self {
            sport: sport.to_string(),
            tags: BTreeSet::new(),
            market_size: 1.0,
            opponent_differential: 0.0,
            stakes: 0.0,
        }
    }

    /// Builder-style tag addition.
    pub fn with_tag(mut self, tag: ContextTag) -> Self {
        self.tags.insert(tag);
        self
    }

    pub fn has_tag(&self, tag: ContextTag) -> bool {
        self.tags.contains(&tag)
    }
}

/// Exogenous market signals resolved to plain numbers before entering the
/// pipeline (the collaborator layers own any network I/O).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalSignals {
    /// Attention/buzz value in [0, 100].
    #[serde(default)]
    pub buzz_score: Option<f64>,
    /// Public betting percentage in [0, 1].
    #[serde(default)]
    pub public_percentage: Option<f64>,
}

/// One correlation weight supplied by the statistical-research layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationWeight {
    /// Observed correlation coefficient.
    pub r: f64,
    /// Sample size behind the observation.
    pub n: u32,
}

/// Feature-name -> correlation weight map for a single sport.
pub type FeatureWeights = BTreeMap<String, CorrelationWeight>;

/// Sport -> feature -> correlation weight. Supplied by the caller at
/// composer construction time; the pipeline never mutates it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationTable(BTreeMap<String, FeatureWeights>);

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sport: &str, feature: &str, r: f64, n: u32) {
        self.0
            .entry(sport.to_string())
            .or_default()
            .insert(feature.to_string(), CorrelationWeight { r, n });
    }

    pub fn for_sport(&self, sport: &str) -> Option<&FeatureWeights> {
        self.0.get(sport).filter(|w| !w.is_empty())
    }

    pub fn sports(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
}

/// One calibration stage's contribution, recorded for explainability.
/// The trace never feeds back into control flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTrace {
    pub stage: String,
    pub multiplier: f64,
    pub confidence_boost: f64,
    pub score_after: f64,
    pub confidence_after: f64,
    pub rationale: String,
}

/// The value threaded through the calibration pipeline. Each stage consumes
/// the previous state and returns a new one; nothing is mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreState {
    /// Current score in [0, 100].
    pub score: f64,
    /// Current confidence in [0, 95].
    pub confidence: f64,
    /// Product of every per-stage multiplier applied so far.
    pub cumulative_multiplier: f64,
    /// Append-only per-stage contributions.
    pub trace: Vec<StageTrace>,
}

impl ScoreState {
    /// Neutral starting point: no signal, no confidence.
    pub fn neutral() -> Self {
        Self {
            score: 50.0,
            confidence: 0.0,
            cumulative_multiplier: 1.0,
            trace: Vec::new(),
        }
    }

    pub fn clamp_score(score: f64) -> f64 {
        score.clamp(0.0, SCORE_CEILING)
    }

    pub fn clamp_confidence(confidence: f64) -> f64 {
        confidence.clamp(0.0, CONFIDENCE_CEILING)
    }

    /// Apply a stage multiplier to the running score and accumulate it.
    /// Out-of-range results saturate silently; that is expected behavior,
    /// not an error.
    pub fn apply_stage(
        mut self,
        stage: &str,
        multiplier: f64,
        confidence_boost: f64,
        rationale: String,
    ) -> Self {
        self.score = Self::clamp_score(self.score * multiplier);
        self.confidence = Self::clamp_confidence(self.confidence + confidence_boost);
        self.cumulative_multiplier *= multiplier;
        self.trace.push(StageTrace {
            stage: stage.to_string(),
            multiplier,
            confidence_boost,
            score_after: self.score,
            confidence_after: self.confidence,
            rationale,
        });
        self
    }

    /// Replace score and confidence outright (stages that recompute rather
    /// than scale). Recorded with a neutral multiplier.
    pub fn replace_scores(
        mut self,
        stage: &str,
        score: f64,
        confidence: f64,
        rationale: String,
    ) -> Self {
        self.score = Self::clamp_score(score);
        self.confidence = Self::clamp_confidence(confidence);
        self.trace.push(StageTrace {
            stage: stage.to_string(),
            multiplier: 1.0,
            confidence_boost: 0.0,
            score_after: self.score,
            confidence_after: self.confidence,
            rationale,
        });
        self
    }
}

/// Betting odds in either market representation. The two convert losslessly
/// except for integer rounding on the American side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Odds {
    /// Signed integer with magnitude >= 100.
    American(i32),
    /// Real payout multiplier >= 1.0.
    Decimal(f64),
}

impl fmt::Display for Odds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Odds::American(a) if *a > 0 => write!(f, "+{}", a),
            Odds::American(a) => write!(f, "{}", a),
            Odds::Decimal(d) => write!(f, "{:.3}", d),
        }
    }
}

/// Outcome of a settled bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Loss,
    Push,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "win"),
            Outcome::Loss => write!(f, "loss"),
            Outcome::Push => write!(f, "push"),
        }
    }
}

/// A placed bet. Owned by the ledger from allocation to settlement, then
/// archived and never mutated again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetTicket {
    pub id: String,
    pub stake: f64,
    pub odds: Odds,
    pub placed_at: DateTime<Utc>,
}

impl BetTicket {
    pub fn new(id: &str, stake: f64, odds: Odds) -> Self {
        Self {
            id: id.to_string(),
            stake,
            odds,
            placed_at: Utc::now(),
        }
    }
}

/// Discrete recommendation bucket, weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Pass,
    Lean,
    Bet,
    ConfidentBet,
    StrongBet,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Pass => write!(f, "PASS"),
            Tier::Lean => write!(f, "LEAN"),
            Tier::Bet => write!(f, "BET"),
            Tier::ConfidentBet => write!(f, "CONFIDENT BET"),
            Tier::StrongBet => write!(f, "STRONG BET"),
        }
    }
}

/// Final pipeline output for one subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub score: f64,
    pub confidence: f64,
    pub cumulative_multiplier: f64,
    pub tier: Tier,
    pub trace: Vec<StageTrace>,
}

impl Recommendation {
    /// Human-readable tier label; the strongest tier carries the cumulative
    /// multiplier as a size hint.
    pub fn tier_label(&self) -> String {
        match self.tier {
            Tier::StrongBet => {
                format!("STRONG BET (size x{:.1})", self.cumulative_multiplier)
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_vector_access() {
        let fv = FeatureVector::new()
            .with(FEATURE_HARSHNESS, 72.0)
            .with(FEATURE_SYLLABLES, 2.0);

        assert_eq!(fv.get(FEATURE_HARSHNESS), Some(72.0));
        assert_eq!(fv.get(FEATURE_MEMORABILITY), None);
        assert!(!fv.is_empty());
    }

    #[test]
    fn test_context_tags() {
        let ctx = Context::new("football")
            .with_tag(ContextTag::Playoff)
            .with_tag(ContextTag::Primetime);

        assert!(ctx.has_tag(ContextTag::Playoff));
        assert!(!ctx.has_tag(ContextTag::Championship));
        assert_eq!(ctx.tags.len(), 2);
    }

    #[test]
    fn test_score_state_apply_clamps() {
        let state = ScoreState::neutral().apply_stage("boost", 5.0, 200.0, "extreme".into());

        assert_eq!(state.score, 100.0);
        assert_eq!(state.confidence, 95.0);
        assert_eq!(state.cumulative_multiplier, 5.0);
        assert_eq!(state.trace.len(), 1);
    }

    #[test]
    fn test_score_state_trace_is_append_only() {
        let state = ScoreState::neutral()
            .apply_stage("a", 1.1, 0.0, "first".into())
            .apply_stage("b", 0.9, 5.0, "second".into());

        assert_eq!(state.trace.len(), 2);
        assert_eq!(state.trace[0].stage, "a");
        assert_eq!(state.trace[1].stage, "b");
        assert!((state.cumulative_multiplier - 0.99).abs() < 1e-9);
    }

    #[test]
    fn test_correlation_table_lookup() {
        let mut table = CorrelationTable::new();
        table.insert("football", FEATURE_HARSHNESS, 0.427, 2000);

        assert!(table.for_sport("football").is_some());
        assert!(table.for_sport("curling").is_none());
    }

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::Pass < Tier::Lean);
        assert!(Tier::Bet < Tier::StrongBet);
    }

    #[test]
    fn test_odds_display() {
        assert_eq!(Odds::American(150).to_string(), "+150");
        assert_eq!(Odds::American(-110).to_string(), "-110");
    }

    #[test]
    fn test_context_tag_serde_roundtrip() {
        let json = serde_json::to_string(&ContextTag::NationalBroadcast).unwrap();
        assert_eq!(json, "\"national_broadcast\"");
        let back: ContextTag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ContextTag::NationalBroadcast);
    }
}
