use super::super::domain::{AthleteDataBundle, Badge};
use super::config::EvaluationConfig;
use super::rules::evaluate_rule;
use super::BadgeScore;

/// Accumulate rule weights into a progress percentage and earned verdict.
///
/// Badges with required rules are earned once every required rule passes;
/// optional rules only move the displayed progress. Badges without required
/// rules are earned at full progress.
pub(crate) fn score_badge(
    badge: &Badge,
    bundle: &AthleteDataBundle,
    config: &EvaluationConfig,
) -> BadgeScore {
    let mut max_score = 0.0;
    let mut score = 0.0;
    let mut required_total = 0;
    let mut required_passed = 0;
    let mut rule_results = Vec::with_capacity(badge.rules.len());

    for rule in &badge.rules {
        max_score += rule.weight;
        if rule.required {
            required_total += 1;
        }

        let result = evaluate_rule(rule, bundle, config);
        if result.passed {
            score += rule.weight;
            if rule.required {
                required_passed += 1;
            }
        }
        rule_results.push(result);
    }

    let progress = progress_percent(score, max_score);
    let earned = if required_total > 0 {
        required_passed == required_total
    } else {
        progress >= 100
    };

    BadgeScore {
        badge_id: badge.id.clone(),
        earned,
        progress,
        score,
        max_score,
        required_total,
        required_passed,
        rule_results,
    }
}

pub(crate) fn progress_percent(score: f64, max_score: f64) -> u8 {
    if max_score <= 0.0 || !max_score.is_finite() {
        return 0;
    }

    (100.0 * score / max_score).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::progress_percent;

    #[test]
    fn progress_rounds_and_clamps() {
        assert_eq!(progress_percent(0.6, 1.0), 60);
        assert_eq!(progress_percent(2.0, 3.0), 67);
        assert_eq!(progress_percent(1.0, 0.0), 0);
        assert_eq!(progress_percent(5.0, 4.0), 100);
    }
}
