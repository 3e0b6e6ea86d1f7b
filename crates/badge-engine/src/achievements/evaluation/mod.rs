mod config;
mod operators;
mod rules;
mod scoring;

pub use config::EvaluationConfig;
pub use operators::{Comparison, ComparisonParseError};

use super::domain::{AthleteDataBundle, Badge, BadgeId, Rule, RuleId};
use serde::Serialize;

/// Stateless evaluator that applies badge rules to an athlete's data bundle.
#[derive(Debug, Clone, Default)]
pub struct EvaluationEngine {
    config: EvaluationConfig,
}

impl EvaluationEngine {
    pub fn new(config: EvaluationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Evaluate a single rule; malformed rules and absent data fail closed.
    pub fn evaluate_rule(&self, rule: &Rule, bundle: &AthleteDataBundle) -> bool {
        rules::evaluate_rule(rule, bundle, &self.config).passed
    }

    pub fn score(&self, badge: &Badge, bundle: &AthleteDataBundle) -> BadgeScore {
        scoring::score_badge(badge, bundle, &self.config)
    }
}

/// Outcome of one rule, kept for audits of a badge score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleResult {
    pub rule_id: RuleId,
    pub rule_type: &'static str,
    pub passed: bool,
    pub weight: f64,
    pub required: bool,
    pub observed: Option<f64>,
}

/// Weighted verdict for one badge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BadgeScore {
    pub badge_id: BadgeId,
    pub earned: bool,
    pub progress: u8,
    pub score: f64,
    pub max_score: f64,
    pub required_total: usize,
    pub required_passed: usize,
    pub rule_results: Vec<RuleResult>,
}
