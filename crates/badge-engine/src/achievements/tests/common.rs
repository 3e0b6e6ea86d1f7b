use std::collections::BTreeMap;
use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::achievements::domain::{
    AchievementLevel, ActivityDomain, AthleteDataBundle, AthleteId, AthleteProfile, AwardedBadge,
    Badge, BadgeId, CoachId, MatchPerformance, MatchResult, NewAward, Rule, RuleId, RuleKind,
    SkillSnapshot, WellnessEntry,
};
use crate::achievements::evaluation::{Comparison, EvaluationConfig, EvaluationEngine};
use crate::achievements::memory::InMemoryAchievementStore;
use crate::achievements::repository::{AchievementStore, RepositoryError};
use crate::achievements::service::AchievementService;

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 30).expect("valid date")
}

pub(super) fn days_ago(offset: i64) -> NaiveDate {
    today() - Duration::days(offset)
}

pub(super) fn evaluation_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 30, 18, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn engine() -> EvaluationEngine {
    EvaluationEngine::new(EvaluationConfig::default())
}

pub(super) fn rule(id: &str, kind: RuleKind, comparison: Comparison, weight: f64) -> Rule {
    Rule {
        id: RuleId(id.to_string()),
        kind,
        comparison,
        weight,
        required: false,
        description: None,
    }
}

pub(super) fn required(mut rule: Rule) -> Rule {
    rule.required = true;
    rule
}

pub(super) fn skills_metric(id: &str, field: &str, comparison: Comparison) -> Rule {
    rule(
        id,
        RuleKind::SkillsMetric {
            field: field.to_string(),
        },
        comparison,
        1.0,
    )
}

pub(super) fn badge(id: &str, rules: Vec<Rule>) -> Badge {
    Badge {
        id: BadgeId(id.to_string()),
        name: format!("Badge {id}"),
        description: format!("Earn {id}"),
        motivation: None,
        icon: None,
        level: AchievementLevel::Entry,
        domain: ActivityDomain::Any,
        owner: None,
        active: true,
        rules,
    }
}

pub(super) fn coach_badge(id: &str, coach: &str, rules: Vec<Rule>) -> Badge {
    Badge {
        owner: Some(CoachId(coach.to_string())),
        ..badge(id, rules)
    }
}

/// Single required `pushupScore >= 10` rule.
pub(super) fn pushup_badge(id: &str) -> Badge {
    badge(
        id,
        vec![required(skills_metric(
            "pushups",
            "pushupScore",
            Comparison::Gte(10.0),
        ))],
    )
}

pub(super) fn snapshot(metrics: &[(&str, f64)]) -> SkillSnapshot {
    SkillSnapshot::from_metrics(metrics.iter().map(|(field, value)| (*field, *value)))
}

pub(super) fn athlete(id: &str, coach: Option<&str>, metrics: &[(&str, f64)]) -> AthleteProfile {
    AthleteProfile {
        id: AthleteId(id.to_string()),
        name: format!("Athlete {id}"),
        coach: coach.map(|coach| CoachId(coach.to_string())),
        sport: Some("cricket".to_string()),
        snapshot: snapshot(metrics),
    }
}

pub(super) fn bundle(metrics: &[(&str, f64)]) -> AthleteDataBundle {
    AthleteDataBundle::new(snapshot(metrics), Vec::new(), Vec::new())
}

pub(super) fn rated_match(offset: i64, rating: f64) -> MatchPerformance {
    MatchPerformance {
        played_on: days_ago(offset),
        played: true,
        result: MatchResult::Win,
        rating: Some(rating),
        stats: String::new(),
    }
}

pub(super) fn stats_match(offset: i64, result: MatchResult, stats: &str) -> MatchPerformance {
    MatchPerformance {
        played_on: days_ago(offset),
        played: true,
        result,
        rating: None,
        stats: stats.to_string(),
    }
}

pub(super) fn wellness(offset: i64, metrics: &[(&str, f64)]) -> WellnessEntry {
    WellnessEntry {
        recorded_on: days_ago(offset),
        metrics: metrics
            .iter()
            .map(|(field, value)| (field.to_string(), *value))
            .collect::<BTreeMap<_, _>>(),
    }
}

pub(super) fn store_with(
    athletes: Vec<AthleteProfile>,
    badges: Vec<Badge>,
) -> InMemoryAchievementStore {
    let store = InMemoryAchievementStore::default();
    for athlete in athletes {
        store.put_athlete(athlete);
    }
    for badge in badges {
        store.put_badge(badge);
    }
    store
}

pub(super) fn service_over<S>(store: S) -> AchievementService<S>
where
    S: AchievementStore + 'static,
{
    AchievementService::new(Arc::new(store), EvaluationConfig::default())
}

pub(super) fn athlete_id(id: &str) -> AthleteId {
    AthleteId(id.to_string())
}

pub(super) fn badge_id(id: &str) -> BadgeId {
    BadgeId(id.to_string())
}

/// Failure injected into [`FaultyStore::insert_award`].
#[derive(Debug, Clone, Copy)]
pub(super) enum InsertFault {
    /// Another writer stores the award first, then the insert loses the race.
    LostRace,
    Unavailable,
}

/// In-memory store with injectable faults.
#[derive(Default)]
pub(super) struct FaultyStore {
    pub(super) inner: InMemoryAchievementStore,
    pub(super) insert_fault: Option<InsertFault>,
    pub(super) unreadable_athlete: Option<AthleteId>,
    pub(super) panicking_athlete: Option<AthleteId>,
}

impl AchievementStore for FaultyStore {
    fn athlete(&self, id: &AthleteId) -> Result<Option<AthleteProfile>, RepositoryError> {
        if self.unreadable_athlete.as_ref() == Some(id) {
            return Err(RepositoryError::Unavailable("replica lagging".to_string()));
        }
        if self.panicking_athlete.as_ref() == Some(id) {
            panic!("corrupt athlete record");
        }
        self.inner.athlete(id)
    }

    fn recent_matches(
        &self,
        id: &AthleteId,
        limit: usize,
    ) -> Result<Vec<MatchPerformance>, RepositoryError> {
        self.inner.recent_matches(id, limit)
    }

    fn recent_wellness(
        &self,
        id: &AthleteId,
        limit: usize,
    ) -> Result<Vec<WellnessEntry>, RepositoryError> {
        self.inner.recent_wellness(id, limit)
    }

    fn badge_catalog(&self) -> Result<Vec<Badge>, RepositoryError> {
        self.inner.badge_catalog()
    }

    fn active_awards(&self, id: &AthleteId) -> Result<Vec<AwardedBadge>, RepositoryError> {
        self.inner.active_awards(id)
    }

    fn insert_award(&self, award: NewAward) -> Result<AwardedBadge, RepositoryError> {
        match self.insert_fault {
            None => self.inner.insert_award(award),
            Some(InsertFault::LostRace) => {
                self.inner.insert_award(award.clone())?;
                self.inner.insert_award(award)
            }
            Some(InsertFault::Unavailable) => {
                Err(RepositoryError::Unavailable("database offline".to_string()))
            }
        }
    }

    fn athletes_with_data(&self) -> Result<Vec<AthleteId>, RepositoryError> {
        self.inner.athletes_with_data()
    }
}

/// Store whose every read fails.
pub(super) struct OfflineStore;

impl AchievementStore for OfflineStore {
    fn athlete(&self, _id: &AthleteId) -> Result<Option<AthleteProfile>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn recent_matches(
        &self,
        _id: &AthleteId,
        _limit: usize,
    ) -> Result<Vec<MatchPerformance>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn recent_wellness(
        &self,
        _id: &AthleteId,
        _limit: usize,
    ) -> Result<Vec<WellnessEntry>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn badge_catalog(&self) -> Result<Vec<Badge>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn active_awards(&self, _id: &AthleteId) -> Result<Vec<AwardedBadge>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_award(&self, _award: NewAward) -> Result<AwardedBadge, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn athletes_with_data(&self) -> Result<Vec<AthleteId>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
