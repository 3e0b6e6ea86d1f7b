use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    AthleteId, AthleteProfile, AwardId, AwardedBadge, Badge, BadgeId, MatchPerformance, NewAward,
    WellnessEntry, AWARD_PROGRESS,
};
use super::evaluation::EvaluationConfig;
use super::legacy::BadgeRow;
use super::metrics::provided;
use super::repository::{AchievementStore, RepositoryError};

/// Seed document for [`InMemoryAchievementStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSeed {
    #[serde(default)]
    pub athletes: Vec<AthleteProfile>,
    #[serde(default)]
    pub badges: Vec<Badge>,
    /// Badges still in the string-encoded editor format.
    #[serde(default)]
    pub legacy_badges: Vec<BadgeRow>,
    #[serde(default)]
    pub matches: Vec<SeedMatch>,
    #[serde(default)]
    pub wellness: Vec<SeedWellness>,
    #[serde(default)]
    pub awards: Vec<AwardedBadge>,
    /// Evaluation tunables such as the percentile bands.
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedMatch {
    pub athlete_id: AthleteId,
    #[serde(flatten)]
    pub record: MatchPerformance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedWellness {
    pub athlete_id: AthleteId,
    #[serde(flatten)]
    pub entry: WellnessEntry,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read store seed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store seed is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("badge {0} is defined more than once")]
    DuplicateBadge(BadgeId),
    #[error("athlete {0} is defined more than once")]
    DuplicateAthlete(AthleteId),
    #[error("award {0} is defined more than once")]
    DuplicateAward(String),
}

/// Mutex-backed store used by tests, demos and the local service host.
#[derive(Default, Clone)]
pub struct InMemoryAchievementStore {
    athletes: Arc<Mutex<BTreeMap<AthleteId, AthleteProfile>>>,
    matches: Arc<Mutex<BTreeMap<AthleteId, Vec<MatchPerformance>>>>,
    wellness: Arc<Mutex<BTreeMap<AthleteId, Vec<WellnessEntry>>>>,
    badges: Arc<Mutex<Vec<Badge>>>,
    awards: Arc<Mutex<Vec<AwardedBadge>>>,
    award_sequence: Arc<AtomicU64>,
    evaluation: EvaluationConfig,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
}

impl InMemoryAchievementStore {
    pub fn from_seed(seed: StoreSeed) -> Result<Self, CatalogError> {
        let store = Self {
            evaluation: seed.evaluation,
            ..Self::default()
        };

        let mut badge_ids = HashSet::new();
        let badges = seed
            .badges
            .into_iter()
            .chain(seed.legacy_badges.into_iter().map(BadgeRow::into_badge));
        for badge in badges {
            if !badge_ids.insert(badge.id.clone()) {
                return Err(CatalogError::DuplicateBadge(badge.id));
            }
            store.put_badge(badge);
        }

        for athlete in seed.athletes {
            if store.has_athlete(&athlete.id) {
                return Err(CatalogError::DuplicateAthlete(athlete.id));
            }
            store.put_athlete(athlete);
        }
        for SeedMatch { athlete_id, record } in seed.matches {
            store.push_match(&athlete_id, record);
        }
        for SeedWellness { athlete_id, entry } in seed.wellness {
            store.push_wellness(&athlete_id, entry);
        }
        let mut award_ids = HashSet::new();
        for award in &seed.awards {
            if !award_ids.insert(award.id.clone()) {
                return Err(CatalogError::DuplicateAward(award.id.0.clone()));
            }
        }
        let last_sequence = seed
            .awards
            .iter()
            .filter_map(|award| award_sequence_number(&award.id))
            .max()
            .unwrap_or(0);
        store
            .award_sequence
            .store(last_sequence, Ordering::Relaxed);
        if let Ok(mut awards) = store.awards.lock() {
            awards.extend(seed.awards);
        }

        Ok(store)
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let seed: StoreSeed = serde_json::from_reader(reader)?;
        Self::from_seed(seed)
    }

    pub fn put_athlete(&self, athlete: AthleteProfile) {
        if let Ok(mut athletes) = self.athletes.lock() {
            athletes.insert(athlete.id.clone(), athlete);
        }
    }

    pub fn put_badge(&self, badge: Badge) {
        if let Ok(mut badges) = self.badges.lock() {
            match badges.iter_mut().find(|existing| existing.id == badge.id) {
                Some(existing) => *existing = badge,
                None => badges.push(badge),
            }
        }
    }

    pub fn push_match(&self, athlete_id: &AthleteId, record: MatchPerformance) {
        if let Ok(mut matches) = self.matches.lock() {
            matches.entry(athlete_id.clone()).or_default().push(record);
        }
    }

    pub fn push_wellness(&self, athlete_id: &AthleteId, entry: WellnessEntry) {
        if let Ok(mut wellness) = self.wellness.lock() {
            wellness.entry(athlete_id.clone()).or_default().push(entry);
        }
    }

    /// Evaluation tunables carried by the seed.
    pub fn evaluation_config(&self) -> &EvaluationConfig {
        &self.evaluation
    }

    /// Every award ever stored, revoked ones included.
    pub fn awards(&self) -> Vec<AwardedBadge> {
        self.awards
            .lock()
            .map(|awards| awards.clone())
            .unwrap_or_default()
    }

    pub fn revoke(
        &self,
        award_id: &AwardId,
        revoked_by: &str,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<AwardedBadge, RepositoryError> {
        let mut awards = lock(&self.awards)?;
        let award = awards
            .iter_mut()
            .find(|award| &award.id == award_id && award.is_active())
            .ok_or(RepositoryError::NotFound)?;
        award.revoke(revoked_by, reason, at);
        Ok(award.clone())
    }

    fn has_athlete(&self, id: &AthleteId) -> bool {
        self.athletes
            .lock()
            .map(|athletes| athletes.contains_key(id))
            .unwrap_or(false)
    }

    fn next_award_id(&self) -> AwardId {
        let id = self.award_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        AwardId(format!("{AWARD_ID_PREFIX}{id:06}"))
    }
}

const AWARD_ID_PREFIX: &str = "award-";

fn award_sequence_number(id: &AwardId) -> Option<u64> {
    id.0.strip_prefix(AWARD_ID_PREFIX)?.parse().ok()
}

fn most_recent<T: Clone>(
    records: Option<&Vec<T>>,
    limit: usize,
    date: impl Fn(&T) -> chrono::NaiveDate,
) -> Vec<T> {
    let mut records = records.cloned().unwrap_or_default();
    records.sort_by_key(|record| std::cmp::Reverse(date(record)));
    records.truncate(limit);
    records
}

impl AchievementStore for InMemoryAchievementStore {
    fn athlete(&self, id: &AthleteId) -> Result<Option<AthleteProfile>, RepositoryError> {
        Ok(lock(&self.athletes)?.get(id).cloned())
    }

    fn recent_matches(
        &self,
        id: &AthleteId,
        limit: usize,
    ) -> Result<Vec<MatchPerformance>, RepositoryError> {
        let matches = lock(&self.matches)?;
        Ok(most_recent(matches.get(id), limit, |record| record.played_on))
    }

    fn recent_wellness(
        &self,
        id: &AthleteId,
        limit: usize,
    ) -> Result<Vec<WellnessEntry>, RepositoryError> {
        let wellness = lock(&self.wellness)?;
        Ok(most_recent(wellness.get(id), limit, |entry| entry.recorded_on))
    }

    fn badge_catalog(&self) -> Result<Vec<Badge>, RepositoryError> {
        Ok(lock(&self.badges)?.clone())
    }

    fn active_awards(&self, id: &AthleteId) -> Result<Vec<AwardedBadge>, RepositoryError> {
        Ok(lock(&self.awards)?
            .iter()
            .filter(|award| &award.athlete_id == id && award.is_active())
            .cloned()
            .collect())
    }

    fn insert_award(&self, award: NewAward) -> Result<AwardedBadge, RepositoryError> {
        let mut awards = lock(&self.awards)?;
        let duplicate = awards.iter().any(|existing| {
            existing.athlete_id == award.athlete_id
                && existing.badge_id == award.badge_id
                && existing.is_active()
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }

        let stored = AwardedBadge {
            id: self.next_award_id(),
            athlete_id: award.athlete_id,
            badge_id: award.badge_id,
            awarded_at: award.awarded_at,
            score: award.score,
            progress: AWARD_PROGRESS,
            revocation: Default::default(),
        };
        awards.push(stored.clone());
        Ok(stored)
    }

    fn athletes_with_data(&self) -> Result<Vec<AthleteId>, RepositoryError> {
        let athletes = lock(&self.athletes)?;
        let matches = lock(&self.matches)?;
        let wellness = lock(&self.wellness)?;

        Ok(athletes
            .values()
            .filter(|athlete| {
                athlete
                    .snapshot
                    .metrics
                    .values()
                    .any(|value| provided(Some(*value)).is_some())
                    || matches.get(&athlete.id).is_some_and(|list| !list.is_empty())
                    || wellness.get(&athlete.id).is_some_and(|list| !list.is_empty())
            })
            .map(|athlete| athlete.id.clone())
            .collect())
    }
}
