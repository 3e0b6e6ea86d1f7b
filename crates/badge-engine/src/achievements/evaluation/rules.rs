use tracing::{debug, warn};

use super::super::domain::{AthleteDataBundle, Rule, RuleKind, TechnicalSkill};
use super::super::history::{self, StreakOutcome};
use super::super::metrics::{self, provided};
use super::config::EvaluationConfig;
use super::operators::Comparison;
use super::RuleResult;

/// Resolved value and verdict for one rule before weights are applied.
pub(crate) struct RuleSignal {
    pub passed: bool,
    pub observed: Option<f64>,
}

impl RuleSignal {
    fn failed() -> Self {
        Self {
            passed: false,
            observed: None,
        }
    }

    fn compare(comparison: &Comparison, value: Option<f64>) -> Self {
        match value {
            Some(value) => Self {
                passed: comparison.matches(value),
                observed: Some(value),
            },
            None => Self::failed(),
        }
    }

    fn streak(rule: &Rule, outcome: StreakOutcome) -> Self {
        debug!(
            rule_id = %rule.id.0,
            rule_type = rule.kind.label(),
            run_length = outcome.run_length,
            window = outcome.window,
            available = outcome.available,
            satisfied = outcome.satisfied,
            "streak checked"
        );
        Self {
            passed: outcome.satisfied,
            observed: Some(outcome.run_length as f64),
        }
    }
}

pub(crate) fn evaluate_rule(
    rule: &Rule,
    bundle: &AthleteDataBundle,
    config: &EvaluationConfig,
) -> RuleResult {
    let signal = resolve(rule, bundle, config);

    RuleResult {
        rule_id: rule.id.clone(),
        rule_type: rule.kind.label(),
        passed: signal.passed,
        weight: rule.weight,
        required: rule.required,
        observed: signal.observed,
    }
}

fn resolve(rule: &Rule, bundle: &AthleteDataBundle, config: &EvaluationConfig) -> RuleSignal {
    let comparison = &rule.comparison;
    if !comparison.is_supported() {
        warn!(rule_id = %rule.id.0, "rule has an unsupported comparison; treating as failed");
        return RuleSignal::failed();
    }

    match &rule.kind {
        RuleKind::SkillsMetric { field } => {
            RuleSignal::compare(comparison, metrics::get(bundle, field))
        }
        RuleKind::SkillsAverage => RuleSignal::compare(
            comparison,
            history::running_average(
                TechnicalSkill::ALL
                    .into_iter()
                    .map(|skill| metrics::technical_skill(bundle, skill)),
            ),
        ),
        RuleKind::SkillsAny => {
            match metrics::technical_skills(bundle).find(|(_, value)| comparison.matches(*value)) {
                Some((_, value)) => RuleSignal {
                    passed: true,
                    observed: Some(value),
                },
                None => RuleSignal::failed(),
            }
        }
        RuleKind::MatchCount { category } => {
            let count = history::match_count(&bundle.matches, *category);
            RuleSignal::compare(comparison, provided(Some(count as f64)))
        }
        RuleKind::MatchStat { stat } => {
            RuleSignal::compare(comparison, history::best_of(&bundle.matches, stat))
        }
        RuleKind::MatchStreak { field, window } => {
            let outcome = history::streak(bundle.recent_matches(*window), *window, |record| {
                history::match_field(record, field)
                    .map(|value| comparison.matches(value))
                    .unwrap_or(false)
            });
            RuleSignal::streak(rule, outcome)
        }
        RuleKind::MatchAverage { field, window } => RuleSignal::compare(
            comparison,
            history::running_average(
                bundle
                    .recent_matches(*window)
                    .iter()
                    .map(|record| history::match_field(record, field)),
            ),
        ),
        RuleKind::WellnessStreak { field, window } => {
            let outcome = history::streak(bundle.recent_wellness(*window), *window, |entry| {
                history::wellness_entry_passes(entry, field, comparison)
            });
            RuleSignal::streak(rule, outcome)
        }
        RuleKind::FitnessPercentile => RuleSignal::compare(
            comparison,
            history::fitness_composite(bundle)
                .map(|score| f64::from(config.percentile_bands.bucket(score))),
        ),
        RuleKind::PeakScorePercentile => RuleSignal::compare(
            comparison,
            history::peak_score(bundle)
                .map(|score| f64::from(config.percentile_bands.bucket(score))),
        ),
        RuleKind::Unsupported => {
            warn!(rule_id = %rule.id.0, "rule has an unsupported rule type; treating as failed");
            RuleSignal::failed()
        }
    }
}
