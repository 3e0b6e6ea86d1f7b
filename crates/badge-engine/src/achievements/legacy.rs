//! Conversion from the string-encoded catalog rows still produced by the
//! badge editor into typed badges and rules.
//!
//! Rows carry a window length inside the free-text description and mark
//! coach-owned badges with a `[coach:<id>]` tag inside the badge description.
//! Both are resolved here, once, so evaluation never re-parses strings.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{
    AchievementLevel, ActivityDomain, Badge, BadgeId, CoachId, MatchCategory, Rule, RuleId,
    RuleKind, WellnessField,
};
use super::evaluation::Comparison;

pub const DEFAULT_STREAK_WINDOW: usize = 5;
pub const DEFAULT_AVERAGE_WINDOW: usize = 5;

const OWNER_MARKER_PREFIX: &str = "[coach:";

/// Rule row as stored by the badge editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRow {
    pub id: String,
    pub rule_type: String,
    pub field_name: String,
    pub operator: String,
    pub target_value: String,
    pub weight: f64,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl RuleRow {
    pub fn into_rule(self) -> Rule {
        let comparison = match Comparison::parse(&self.operator, &self.target_value) {
            Ok(comparison) => comparison,
            Err(error) => {
                warn!(rule_id = %self.id, %error, "rule comparison not understood");
                Comparison::Unsupported
            }
        };
        let kind = self.kind();

        Rule {
            id: RuleId(self.id),
            kind,
            comparison,
            weight: self.weight,
            required: self.is_required,
            description: self.description,
        }
    }

    fn kind(&self) -> RuleKind {
        let field = self.field_name.trim().to_string();
        let window = |default: usize| {
            self.description
                .as_deref()
                .and_then(window_from_text)
                .unwrap_or(default)
        };

        match self.rule_type.trim().to_ascii_uppercase().as_str() {
            "SKILLS_METRIC" => RuleKind::SkillsMetric { field },
            "SKILLS_AVERAGE" => RuleKind::SkillsAverage,
            "SKILLS_ANY" => RuleKind::SkillsAny,
            "MATCH_COUNT" => match match_category(&field) {
                Some(category) => RuleKind::MatchCount { category },
                None => {
                    warn!(rule_id = %self.id, field = %field, "unknown match count category");
                    RuleKind::Unsupported
                }
            },
            "MATCH_STAT" => RuleKind::MatchStat { stat: field },
            "MATCH_STREAK" => RuleKind::MatchStreak {
                field,
                window: window(DEFAULT_STREAK_WINDOW),
            },
            "MATCH_AVERAGE" => RuleKind::MatchAverage {
                field,
                window: window(DEFAULT_AVERAGE_WINDOW),
            },
            "WELLNESS_STREAK" => RuleKind::WellnessStreak {
                field: wellness_field(field),
                window: window(DEFAULT_STREAK_WINDOW),
            },
            "FITNESS_PERCENTILE" => RuleKind::FitnessPercentile,
            "PEAKSCORE_PERCENTILE" | "PEAK_SCORE_PERCENTILE" => RuleKind::PeakScorePercentile,
            other => {
                warn!(rule_id = %self.id, rule_type = other, "unknown rule type");
                RuleKind::Unsupported
            }
        }
    }
}

/// Badge row as stored by the badge editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub motivational_text: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    pub level: String,
    #[serde(default)]
    pub sport: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub rules: Vec<RuleRow>,
}

fn default_active() -> bool {
    true
}

impl BadgeRow {
    pub fn into_badge(self) -> Badge {
        let (description, owner) = split_owner_marker(&self.description);
        let level = parse_level(&self.level).unwrap_or_else(|| {
            warn!(badge_id = %self.id, level = %self.level, "unknown badge level; using entry");
            AchievementLevel::Entry
        });

        Badge {
            id: BadgeId(self.id),
            name: self.name,
            description,
            motivation: self.motivational_text,
            icon: self.icon,
            level,
            domain: ActivityDomain::parse(&self.sport),
            owner,
            active: self.is_active,
            rules: self.rules.into_iter().map(RuleRow::into_rule).collect(),
        }
    }
}

/// First positive integer in the text, e.g. `"7 consecutive days"` → 7.
pub fn window_from_text(text: &str) -> Option<usize> {
    text.split(|c: char| !c.is_ascii_digit())
        .find(|digits| !digits.is_empty())
        .and_then(|digits| digits.parse::<usize>().ok())
        .filter(|window| *window > 0)
}

fn match_category(field: &str) -> Option<MatchCategory> {
    match field.to_ascii_lowercase().as_str() {
        "played" | "matches" | "matchesplayed" | "matches_played" => Some(MatchCategory::Played),
        "won" | "wins" | "matcheswon" | "matches_won" => Some(MatchCategory::Won),
        "fielding" | "fieldingappearances" | "fielding_appearances" => {
            Some(MatchCategory::Fielding)
        }
        _ => None,
    }
}

fn wellness_field(field: String) -> WellnessField {
    match field.to_ascii_lowercase().as_str() {
        "all" | "allmetrics" | "all_metrics" => WellnessField::AllMetrics,
        _ => WellnessField::Metric(field),
    }
}

fn parse_level(raw: &str) -> Option<AchievementLevel> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "entry" | "beginner" | "bronze" => Some(AchievementLevel::Entry),
        "intermediate" | "silver" => Some(AchievementLevel::Intermediate),
        "advanced" | "gold" => Some(AchievementLevel::Advanced),
        "elite" | "expert" | "platinum" => Some(AchievementLevel::Elite),
        _ => None,
    }
}

/// Strip a `[coach:<id>]` marker from a description, returning the owner.
pub fn split_owner_marker(description: &str) -> (String, Option<CoachId>) {
    let Some(start) = description.find(OWNER_MARKER_PREFIX) else {
        return (description.trim().to_string(), None);
    };
    let rest = &description[start + OWNER_MARKER_PREFIX.len()..];
    let Some(end) = rest.find(']') else {
        return (description.trim().to_string(), None);
    };

    let coach = rest[..end].trim();
    let cleaned = format!("{}{}", &description[..start], &rest[end + 1..]);
    let owner = (!coach.is_empty()).then(|| CoachId(coach.to_string()));

    (cleaned.trim().to_string(), owner)
}
