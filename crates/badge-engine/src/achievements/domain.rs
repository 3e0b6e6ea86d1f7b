use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::evaluation::Comparison;

/// Progress recorded on every award at creation time.
pub const AWARD_PROGRESS: u8 = 100;

/// Snapshot field holding the aggregate skill score used for peak-score percentiles.
pub const PEAK_SCORE_FIELD: &str = "peakScore";

/// Identifier wrapper for athletes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AthleteId(pub String);

impl fmt::Display for AthleteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for coaches who own athletes and custom badges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CoachId(pub String);

/// Identifier wrapper for catalog badges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BadgeId(pub String);

impl fmt::Display for BadgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AwardId(pub String);

/// Tier a badge belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementLevel {
    Entry,
    Intermediate,
    Advanced,
    Elite,
}

impl AchievementLevel {
    pub const fn label(self) -> &'static str {
        match self {
            AchievementLevel::Entry => "entry",
            AchievementLevel::Intermediate => "intermediate",
            AchievementLevel::Advanced => "advanced",
            AchievementLevel::Elite => "elite",
        }
    }
}

/// Sport a badge applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityDomain {
    Any,
    Sport(String),
}

impl ActivityDomain {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("any")
            || trimmed.eq_ignore_ascii_case("all")
        {
            ActivityDomain::Any
        } else {
            ActivityDomain::Sport(trimmed.to_string())
        }
    }

    pub fn accepts(&self, sport: Option<&str>) -> bool {
        match self {
            ActivityDomain::Any => true,
            ActivityDomain::Sport(name) => sport
                .map(|sport| sport.trim().eq_ignore_ascii_case(name.trim()))
                .unwrap_or(false),
        }
    }
}

/// Catalog entry describing an achievement and the rules that award it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: BadgeId,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub motivation: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    pub level: AchievementLevel,
    pub domain: ActivityDomain,
    /// Coach that created the badge; `None` for system-wide badges.
    #[serde(default)]
    pub owner: Option<CoachId>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub rules: Vec<Rule>,
}

fn default_active() -> bool {
    true
}

impl Badge {
    /// Whether this badge takes part in evaluations for the given athlete.
    ///
    /// Coach-owned badges are only visible to that coach's athletes; an athlete
    /// without a coach only ever sees system badges.
    pub fn visible_to(&self, athlete: &AthleteProfile) -> bool {
        if !self.active || !self.domain.accepts(athlete.sport.as_deref()) {
            return false;
        }

        match &self.owner {
            None => true,
            Some(owner) => athlete.coach.as_ref() == Some(owner),
        }
    }

    pub fn has_required_rules(&self) -> bool {
        self.rules.iter().any(|rule| rule.required)
    }
}

/// One weighted condition contributing to a badge verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub kind: RuleKind,
    pub comparison: Comparison,
    pub weight: f64,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: Option<String>,
}

/// Rule variants, each carrying the parameters it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    SkillsMetric {
        field: String,
    },
    SkillsAverage,
    SkillsAny,
    MatchCount {
        category: MatchCategory,
    },
    MatchStat {
        stat: String,
    },
    MatchStreak {
        field: String,
        window: usize,
    },
    MatchAverage {
        field: String,
        window: usize,
    },
    WellnessStreak {
        field: WellnessField,
        window: usize,
    },
    FitnessPercentile,
    #[serde(rename = "PEAKSCORE_PERCENTILE")]
    PeakScorePercentile,
    #[serde(other)]
    Unsupported,
}

impl RuleKind {
    pub const fn label(&self) -> &'static str {
        match self {
            RuleKind::SkillsMetric { .. } => "SKILLS_METRIC",
            RuleKind::SkillsAverage => "SKILLS_AVERAGE",
            RuleKind::SkillsAny => "SKILLS_ANY",
            RuleKind::MatchCount { .. } => "MATCH_COUNT",
            RuleKind::MatchStat { .. } => "MATCH_STAT",
            RuleKind::MatchStreak { .. } => "MATCH_STREAK",
            RuleKind::MatchAverage { .. } => "MATCH_AVERAGE",
            RuleKind::WellnessStreak { .. } => "WELLNESS_STREAK",
            RuleKind::FitnessPercentile => "FITNESS_PERCENTILE",
            RuleKind::PeakScorePercentile => "PEAKSCORE_PERCENTILE",
            RuleKind::Unsupported => "UNSUPPORTED",
        }
    }
}

/// Which match records a `MATCH_COUNT` rule counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchCategory {
    Played,
    Won,
    Fielding,
}

/// Field checked on each wellness entry of a streak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WellnessField {
    /// Every tracked wellness metric present and non-zero.
    AllMetrics,
    Metric(String),
}

/// Technical skills scanned by `SKILLS_AVERAGE` and `SKILLS_ANY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TechnicalSkill {
    BattingTechnique,
    BowlingAccuracy,
    Fielding,
    Catching,
    Throwing,
    Footwork,
}

impl TechnicalSkill {
    pub const ALL: [TechnicalSkill; 6] = [
        TechnicalSkill::BattingTechnique,
        TechnicalSkill::BowlingAccuracy,
        TechnicalSkill::Fielding,
        TechnicalSkill::Catching,
        TechnicalSkill::Throwing,
        TechnicalSkill::Footwork,
    ];

    pub const fn field_name(self) -> &'static str {
        match self {
            TechnicalSkill::BattingTechnique => "battingTechnique",
            TechnicalSkill::BowlingAccuracy => "bowlingAccuracy",
            TechnicalSkill::Fielding => "fielding",
            TechnicalSkill::Catching => "catching",
            TechnicalSkill::Throwing => "throwing",
            TechnicalSkill::Footwork => "footwork",
        }
    }
}

/// Fitness test fields blended into the fitness composite, with their weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FitnessComponent {
    Endurance,
    Speed,
    Strength,
    Agility,
}

impl FitnessComponent {
    pub const ALL: [FitnessComponent; 4] = [
        FitnessComponent::Endurance,
        FitnessComponent::Speed,
        FitnessComponent::Strength,
        FitnessComponent::Agility,
    ];

    pub const fn field_name(self) -> &'static str {
        match self {
            FitnessComponent::Endurance => "enduranceScore",
            FitnessComponent::Speed => "speedScore",
            FitnessComponent::Strength => "strengthScore",
            FitnessComponent::Agility => "agilityScore",
        }
    }

    pub const fn weight(self) -> f64 {
        match self {
            FitnessComponent::Endurance => 0.3,
            FitnessComponent::Speed => 0.25,
            FitnessComponent::Strength => 0.25,
            FitnessComponent::Agility => 0.2,
        }
    }
}

/// Metrics captured on a daily wellness log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WellnessMetric {
    SleepQuality,
    Energy,
    Mood,
    Soreness,
    Stress,
}

impl WellnessMetric {
    pub const ALL: [WellnessMetric; 5] = [
        WellnessMetric::SleepQuality,
        WellnessMetric::Energy,
        WellnessMetric::Mood,
        WellnessMetric::Soreness,
        WellnessMetric::Stress,
    ];

    pub const fn field_name(self) -> &'static str {
        match self {
            WellnessMetric::SleepQuality => "sleepQuality",
            WellnessMetric::Energy => "energy",
            WellnessMetric::Mood => "mood",
            WellnessMetric::Soreness => "soreness",
            WellnessMetric::Stress => "stress",
        }
    }
}

/// Current flat skill snapshot for an athlete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillSnapshot {
    #[serde(default)]
    pub recorded_on: Option<NaiveDate>,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

impl SkillSnapshot {
    pub fn from_metrics<I, K>(metrics: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self {
            recorded_on: None,
            metrics: metrics
                .into_iter()
                .map(|(field, value)| (field.into(), value))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchResult {
    Win,
    Loss,
    Draw,
    NoResult,
    #[serde(other)]
    Unknown,
}

/// One match appearance with its opaque stats payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPerformance {
    pub played_on: NaiveDate,
    pub played: bool,
    pub result: MatchResult,
    #[serde(default)]
    pub rating: Option<f64>,
    /// JSON object encoded as a string, as captured by the scoring UI.
    #[serde(default)]
    pub stats: String,
}

/// Daily wellness or skill-history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessEntry {
    pub recorded_on: NaiveDate,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

/// Athlete record as read from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteProfile {
    pub id: AthleteId,
    pub name: String,
    #[serde(default)]
    pub coach: Option<CoachId>,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub snapshot: SkillSnapshot,
}

/// Everything the rule evaluator may look at for one athlete.
///
/// Matches and wellness entries are held most recent first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AthleteDataBundle {
    pub snapshot: SkillSnapshot,
    pub matches: Vec<MatchPerformance>,
    pub wellness: Vec<WellnessEntry>,
}

impl AthleteDataBundle {
    pub fn new(
        snapshot: SkillSnapshot,
        mut matches: Vec<MatchPerformance>,
        mut wellness: Vec<WellnessEntry>,
    ) -> Self {
        matches.sort_by(|a, b| b.played_on.cmp(&a.played_on));
        wellness.sort_by(|a, b| b.recorded_on.cmp(&a.recorded_on));
        Self {
            snapshot,
            matches,
            wellness,
        }
    }

    pub fn recent_matches(&self, count: usize) -> &[MatchPerformance] {
        &self.matches[..count.min(self.matches.len())]
    }

    pub fn recent_wellness(&self, count: usize) -> &[WellnessEntry] {
        &self.wellness[..count.min(self.wellness.len())]
    }
}

/// Revocation sub-record of an award.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Revocation {
    pub revoked: bool,
    #[serde(default)]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub revoked_by: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Persisted record of an athlete earning a badge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwardedBadge {
    pub id: AwardId,
    pub athlete_id: AthleteId,
    pub badge_id: BadgeId,
    pub awarded_at: DateTime<Utc>,
    pub score: f64,
    pub progress: u8,
    #[serde(default)]
    pub revocation: Revocation,
}

impl AwardedBadge {
    pub fn is_active(&self) -> bool {
        !self.revocation.revoked
    }

    pub fn revoke(
        &mut self,
        revoked_by: impl Into<String>,
        reason: impl Into<String>,
        at: DateTime<Utc>,
    ) {
        self.revocation = Revocation {
            revoked: true,
            revoked_at: Some(at),
            revoked_by: Some(revoked_by.into()),
            reason: Some(reason.into()),
        };
    }
}

/// Insert payload for a newly earned badge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAward {
    pub athlete_id: AthleteId,
    pub badge_id: BadgeId,
    pub score: f64,
    pub awarded_at: DateTime<Utc>,
}

/// Per-badge progress returned to callers on every evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub badge_id: BadgeId,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motivation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub level: AchievementLevel,
    pub progress: u8,
    pub earned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earned_at: Option<DateTime<Utc>>,
}

impl ProgressReport {
    pub fn earned(badge: &Badge, earned_at: Option<DateTime<Utc>>) -> Self {
        Self::build(badge, AWARD_PROGRESS, true, earned_at)
    }

    pub fn in_progress(badge: &Badge, progress: u8) -> Self {
        Self::build(badge, progress, false, None)
    }

    fn build(badge: &Badge, progress: u8, earned: bool, earned_at: Option<DateTime<Utc>>) -> Self {
        Self {
            badge_id: badge.id.clone(),
            name: badge.name.clone(),
            description: badge.description.clone(),
            motivation: badge.motivation.clone(),
            icon: badge.icon.clone(),
            level: badge.level,
            progress,
            earned,
            earned_at,
        }
    }
}
