use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    AthleteDataBundle, AthleteId, AthleteProfile, AwardedBadge, Badge, BadgeId, NewAward,
    ProgressReport, RuleKind,
};
use super::evaluation::{EvaluationConfig, EvaluationEngine};
use super::repository::{AchievementStore, RepositoryError};

/// Minimum history pulled into each data bundle.
///
/// Rules needing more widen it through [`HistoryLookback::covering`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLookback {
    pub matches: usize,
    pub wellness: usize,
}

impl Default for HistoryLookback {
    fn default() -> Self {
        Self {
            matches: 50,
            wellness: 60,
        }
    }
}

impl HistoryLookback {
    /// Widen the lookback so every rule of `badges` sees the history it reads.
    ///
    /// `MATCH_COUNT` and `MATCH_STAT` scan the full match history; windowed
    /// rules need at least their window.
    pub fn covering(self, badges: &[Badge]) -> Self {
        badges
            .iter()
            .flat_map(|badge| &badge.rules)
            .fold(self, |mut lookback, rule| {
                match &rule.kind {
                    RuleKind::MatchCount { .. } | RuleKind::MatchStat { .. } => {
                        lookback.matches = usize::MAX;
                    }
                    RuleKind::MatchStreak { window, .. }
                    | RuleKind::MatchAverage { window, .. } => {
                        lookback.matches = lookback.matches.max(*window);
                    }
                    RuleKind::WellnessStreak { window, .. } => {
                        lookback.wellness = lookback.wellness.max(*window);
                    }
                    _ => {}
                }
                lookback
            })
    }
}

/// Result of evaluating every visible badge for one athlete.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AthleteEvaluation {
    pub athlete_id: AthleteId,
    pub newly_awarded: Vec<BadgeId>,
    pub progress: Vec<ProgressReport>,
}

impl AthleteEvaluation {
    pub fn earned(&self) -> impl Iterator<Item = &ProgressReport> {
        self.progress.iter().filter(|report| report.earned)
    }

    pub fn in_progress(&self) -> impl Iterator<Item = &ProgressReport> {
        self.progress.iter().filter(|report| !report.earned)
    }

    pub fn report_for(&self, badge_id: &BadgeId) -> Option<&ProgressReport> {
        self.progress
            .iter()
            .find(|report| &report.badge_id == badge_id)
    }
}

/// Service composing the store and the evaluation engine.
pub struct AchievementService<S> {
    store: Arc<S>,
    engine: Arc<EvaluationEngine>,
    lookback: HistoryLookback,
}

impl<S> AchievementService<S>
where
    S: AchievementStore + 'static,
{
    pub fn new(store: Arc<S>, config: EvaluationConfig) -> Self {
        Self {
            store,
            engine: Arc::new(EvaluationEngine::new(config)),
            lookback: HistoryLookback::default(),
        }
    }

    pub fn with_lookback(mut self, lookback: HistoryLookback) -> Self {
        self.lookback = lookback;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn engine(&self) -> &EvaluationEngine {
        &self.engine
    }

    /// Evaluate every visible badge for the athlete, awarding newly earned ones.
    pub fn evaluate_athlete(
        &self,
        athlete_id: &AthleteId,
    ) -> Result<AthleteEvaluation, EvaluationError> {
        self.evaluate_athlete_at(athlete_id, Utc::now())
    }

    /// Same as [`evaluate_athlete`](Self::evaluate_athlete) with an explicit award timestamp.
    pub fn evaluate_athlete_at(
        &self,
        athlete_id: &AthleteId,
        now: DateTime<Utc>,
    ) -> Result<AthleteEvaluation, EvaluationError> {
        let profile = self
            .store
            .athlete(athlete_id)?
            .ok_or_else(|| EvaluationError::AthleteNotFound(athlete_id.clone()))?;
        let badges = self.visible_badges(&profile)?;
        let bundle = self.load_bundle(&profile, &badges)?;

        let held: HashMap<BadgeId, AwardedBadge> = self
            .store
            .active_awards(athlete_id)?
            .into_iter()
            .filter(AwardedBadge::is_active)
            .map(|award| (award.badge_id.clone(), award))
            .collect();

        let mut newly_awarded = Vec::new();
        let mut progress = Vec::new();

        for badge in badges {
            if let Some(award) = held.get(&badge.id) {
                progress.push(ProgressReport::earned(&badge, Some(award.awarded_at)));
                continue;
            }

            let outcome = self.engine.score(&badge, &bundle);
            if !outcome.earned {
                progress.push(ProgressReport::in_progress(&badge, outcome.progress));
                continue;
            }

            let award = NewAward {
                athlete_id: athlete_id.clone(),
                badge_id: badge.id.clone(),
                score: outcome.score,
                awarded_at: now,
            };

            match self.store.insert_award(award) {
                Ok(stored) => {
                    info!(
                        athlete_id = %athlete_id,
                        badge_id = %badge.id,
                        award_id = %stored.id.0,
                        score = stored.score,
                        "badge awarded"
                    );
                    newly_awarded.push(badge.id.clone());
                    progress.push(ProgressReport::earned(&badge, Some(stored.awarded_at)));
                }
                Err(RepositoryError::Conflict) => {
                    info!(
                        athlete_id = %athlete_id,
                        badge_id = %badge.id,
                        "badge already awarded by a concurrent evaluation"
                    );
                    let earned_at = self.concurrent_award_time(athlete_id, &badge.id);
                    progress.push(ProgressReport::earned(&badge, earned_at));
                }
                Err(error) => {
                    warn!(
                        athlete_id = %athlete_id,
                        badge_id = %badge.id,
                        %error,
                        "failed to persist award; reporting computed progress"
                    );
                    progress.push(ProgressReport::in_progress(&badge, outcome.progress));
                }
            }
        }

        Ok(AthleteEvaluation {
            athlete_id: athlete_id.clone(),
            newly_awarded,
            progress,
        })
    }

    /// Assemble the athlete's data bundle with enough history for `badges`.
    pub fn load_bundle(
        &self,
        profile: &AthleteProfile,
        badges: &[Badge],
    ) -> Result<AthleteDataBundle, EvaluationError> {
        let lookback = self.lookback.covering(badges);
        let matches = self.store.recent_matches(&profile.id, lookback.matches)?;
        let wellness = self.store.recent_wellness(&profile.id, lookback.wellness)?;

        Ok(AthleteDataBundle::new(
            profile.snapshot.clone(),
            matches,
            wellness,
        ))
    }

    fn visible_badges(&self, profile: &AthleteProfile) -> Result<Vec<Badge>, EvaluationError> {
        Ok(self
            .store
            .badge_catalog()?
            .into_iter()
            .filter(|badge| badge.visible_to(profile))
            .collect())
    }

    fn concurrent_award_time(
        &self,
        athlete_id: &AthleteId,
        badge_id: &BadgeId,
    ) -> Option<DateTime<Utc>> {
        self.store
            .active_awards(athlete_id)
            .ok()?
            .into_iter()
            .find(|award| &award.badge_id == badge_id && award.is_active())
            .map(|award| award.awarded_at)
    }
}

/// Error raised by the achievement service.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("athlete {0} not found")]
    AthleteNotFound(AthleteId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
