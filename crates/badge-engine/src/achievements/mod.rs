//! Achievement (badge) rule evaluation.
//!
//! Data flows one way: the batch runner drives the service per athlete, the
//! service scores each visible badge through the evaluation engine, and the
//! engine resolves rules through the metric accessor and the historical
//! aggregations. The store is the only shared state.

pub mod batch;
pub mod domain;
pub mod evaluation;
pub mod history;
pub mod legacy;
pub mod memory;
pub mod metrics;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use batch::{BatchFailure, BatchRunner, BatchSummary};
pub use domain::{
    AchievementLevel, ActivityDomain, AthleteDataBundle, AthleteId, AthleteProfile, AwardId,
    AwardedBadge, Badge, BadgeId, CoachId, FitnessComponent, MatchCategory, MatchPerformance,
    MatchResult, NewAward, ProgressReport, Revocation, Rule, RuleId, RuleKind, SkillSnapshot,
    TechnicalSkill, WellnessEntry, WellnessField, WellnessMetric,
};
pub use evaluation::{BadgeScore, Comparison, EvaluationConfig, EvaluationEngine, RuleResult};
pub use history::{PercentileBand, PercentileBands};
pub use legacy::{BadgeRow, RuleRow};
pub use memory::{CatalogError, InMemoryAchievementStore, StoreSeed};
pub use repository::{AchievementStore, RepositoryError};
pub use router::achievement_router;
pub use service::{AchievementService, AthleteEvaluation, EvaluationError, HistoryLookback};
