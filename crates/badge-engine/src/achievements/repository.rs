use super::domain::{
    AthleteId, AthleteProfile, AwardedBadge, Badge, MatchPerformance, NewAward, WellnessEntry,
};

/// Storage abstraction the evaluation service reads from and awards into.
///
/// `insert_award` must enforce at most one non-revoked award per athlete and
/// badge, returning [`RepositoryError::Conflict`] to the losing writer.
pub trait AchievementStore: Send + Sync {
    fn athlete(&self, id: &AthleteId) -> Result<Option<AthleteProfile>, RepositoryError>;
    /// Most recent matches first, at most `limit` records.
    fn recent_matches(
        &self,
        id: &AthleteId,
        limit: usize,
    ) -> Result<Vec<MatchPerformance>, RepositoryError>;
    /// Most recent wellness entries first, at most `limit` records.
    fn recent_wellness(
        &self,
        id: &AthleteId,
        limit: usize,
    ) -> Result<Vec<WellnessEntry>, RepositoryError>;
    fn badge_catalog(&self) -> Result<Vec<Badge>, RepositoryError>;
    /// Awards held by the athlete that have not been revoked.
    fn active_awards(&self, id: &AthleteId) -> Result<Vec<AwardedBadge>, RepositoryError>;
    fn insert_award(&self, award: NewAward) -> Result<AwardedBadge, RepositoryError>;
    fn athletes_with_data(&self) -> Result<Vec<AthleteId>, RepositoryError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
