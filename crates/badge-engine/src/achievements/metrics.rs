//! Metric accessor over the athlete's current skill snapshot.
//!
//! Missing, zero and non-finite values all read as "not provided" so an
//! unmeasured metric fails its rule instead of scoring as a real zero.

use super::domain::{AthleteDataBundle, TechnicalSkill};

/// Filter a raw reading down to a provided value.
pub fn provided(value: Option<f64>) -> Option<f64> {
    value.filter(|value| value.is_finite() && *value != 0.0)
}

pub fn get(bundle: &AthleteDataBundle, field: &str) -> Option<f64> {
    provided(bundle.snapshot.metrics.get(field).copied())
}

pub fn technical_skill(bundle: &AthleteDataBundle, skill: TechnicalSkill) -> Option<f64> {
    get(bundle, skill.field_name())
}

/// Technical skills that carry a provided value, in declaration order.
pub fn technical_skills(
    bundle: &AthleteDataBundle,
) -> impl Iterator<Item = (TechnicalSkill, f64)> + '_ {
    TechnicalSkill::ALL
        .into_iter()
        .filter_map(move |skill| technical_skill(bundle, skill).map(|value| (skill, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievements::domain::SkillSnapshot;

    fn bundle(metrics: &[(&str, f64)]) -> AthleteDataBundle {
        AthleteDataBundle {
            snapshot: SkillSnapshot::from_metrics(metrics.iter().map(|(k, v)| (*k, *v))),
            ..AthleteDataBundle::default()
        }
    }

    #[test]
    fn zero_missing_and_nan_read_as_absent() {
        let bundle = bundle(&[("pushupScore", 0.0), ("plankSeconds", f64::NAN)]);

        assert_eq!(get(&bundle, "pushupScore"), None);
        assert_eq!(get(&bundle, "plankSeconds"), None);
        assert_eq!(get(&bundle, "sprintTime"), None);
    }

    #[test]
    fn returns_recorded_values() {
        let bundle = bundle(&[("pushupScore", 12.0), ("catching", -1.5)]);

        assert_eq!(get(&bundle, "pushupScore"), Some(12.0));
        assert_eq!(technical_skill(&bundle, TechnicalSkill::Catching), Some(-1.5));
    }

    #[test]
    fn technical_skills_skip_unmeasured_entries() {
        let bundle = bundle(&[("fielding", 7.0), ("footwork", 0.0), ("throwing", 6.0)]);

        let present: Vec<_> = technical_skills(&bundle).collect();
        assert_eq!(
            present,
            vec![(TechnicalSkill::Fielding, 7.0), (TechnicalSkill::Throwing, 6.0)]
        );
    }
}
