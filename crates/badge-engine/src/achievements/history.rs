//! Historical aggregations over match and wellness records.
//!
//! Every function here is pure over the records it is handed. Record slices
//! are expected most recent first, the order `AthleteDataBundle` keeps them in.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::domain::{
    AthleteDataBundle, FitnessComponent, MatchCategory, MatchPerformance, MatchResult,
    WellnessEntry, WellnessField, WellnessMetric, PEAK_SCORE_FIELD,
};
use super::evaluation::Comparison;
use super::metrics::{self, provided};

/// Match field resolved from the record itself rather than the stats payload.
pub const RATING_FIELD: &str = "rating";

/// Stats keys that count as a fielding involvement.
pub const FIELDING_STATS: [&str; 3] = ["catches", "runOuts", "stumpings"];

/// Result of checking a streak window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakOutcome {
    pub satisfied: bool,
    /// Consecutive most recent records that pass, reported for diagnostics only.
    pub run_length: usize,
    pub window: usize,
    pub available: usize,
}

/// Check that the `window` most recent records all pass.
///
/// Fewer records than the window is a failure, as is an empty window.
pub fn streak<T, F>(records: &[T], window: usize, mut passes: F) -> StreakOutcome
where
    F: FnMut(&T) -> bool,
{
    let run_length = records.iter().take_while(|record| passes(*record)).count();
    let satisfied = window > 0 && records.len() >= window && run_length >= window;

    StreakOutcome {
        satisfied,
        run_length,
        window,
        available: records.len(),
    }
}

/// Mean of the provided values; `None` when nothing was provided.
pub fn running_average<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, count) = values
        .into_iter()
        .filter_map(provided)
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StatsPayloadError {
    #[error("stats payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stats payload must be a JSON object")]
    NotAnObject,
}

/// Decode a match stats payload; an empty payload is an empty map.
pub fn parse_stats(payload: &str) -> Result<Map<String, Value>, StatsPayloadError> {
    if payload.trim().is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<Value>(payload)? {
        Value::Object(map) => Ok(map),
        _ => Err(StatsPayloadError::NotAnObject),
    }
}

fn stat_value(stats: &Map<String, Value>, field: &str) -> Option<f64> {
    let value = match stats.get(field)? {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    };
    provided(value)
}

fn decoded_stats(record: &MatchPerformance) -> Option<Map<String, Value>> {
    match parse_stats(&record.stats) {
        Ok(stats) => Some(stats),
        Err(error) => {
            warn!(played_on = %record.played_on, %error, "skipping malformed match stats payload");
            None
        }
    }
}

/// Resolve a named field for one match: the rating, or a stats payload entry.
pub fn match_field(record: &MatchPerformance, field: &str) -> Option<f64> {
    if field == RATING_FIELD {
        return provided(record.rating);
    }

    decoded_stats(record).and_then(|stats| stat_value(&stats, field))
}

/// Highest provided value of `field` across every match stats payload.
pub fn best_of(matches: &[MatchPerformance], field: &str) -> Option<f64> {
    matches
        .iter()
        .filter_map(|record| match_field(record, field))
        .reduce(f64::max)
}

pub fn match_count(matches: &[MatchPerformance], category: MatchCategory) -> usize {
    matches
        .iter()
        .filter(|record| record.played)
        .filter(|record| match category {
            MatchCategory::Played => true,
            MatchCategory::Won => record.result == MatchResult::Win,
            MatchCategory::Fielding => decoded_stats(record)
                .map(|stats| {
                    FIELDING_STATS
                        .iter()
                        .any(|key| stat_value(&stats, key).is_some_and(|value| value > 0.0))
                })
                .unwrap_or(false),
        })
        .count()
}

/// Whether one wellness entry satisfies a streak condition.
pub fn wellness_entry_passes(
    entry: &WellnessEntry,
    field: &WellnessField,
    comparison: &Comparison,
) -> bool {
    match field {
        WellnessField::AllMetrics => WellnessMetric::ALL
            .iter()
            .all(|metric| provided(entry.metrics.get(metric.field_name()).copied()).is_some()),
        WellnessField::Metric(name) => provided(entry.metrics.get(name).copied())
            .map(|value| comparison.matches(value))
            .unwrap_or(false),
    }
}

/// Weighted blend of the provided fitness fields, renormalised over the
/// weights that were actually measured.
pub fn fitness_composite(bundle: &AthleteDataBundle) -> Option<f64> {
    let (weighted, total_weight) = FitnessComponent::ALL
        .into_iter()
        .filter_map(|component| {
            metrics::get(bundle, component.field_name()).map(|value| (value, component.weight()))
        })
        .fold((0.0, 0.0), |(weighted, total), (value, weight)| {
            (weighted + value * weight, total + weight)
        });

    if total_weight > 0.0 {
        Some(weighted / total_weight)
    } else {
        None
    }
}

pub fn peak_score(bundle: &AthleteDataBundle) -> Option<f64> {
    metrics::get(bundle, PEAK_SCORE_FIELD)
}

/// Score threshold mapped to a percentile band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileBand {
    pub min_score: f64,
    pub percentile: u8,
}

/// Fixed score-to-percentile bands.
///
/// This is a coarse approximation on a 0–100 composite scale. It does not
/// rank the athlete against any cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileBands {
    pub bands: Vec<PercentileBand>,
    pub floor: u8,
}

impl Default for PercentileBands {
    fn default() -> Self {
        Self {
            bands: vec![
                PercentileBand {
                    min_score: 80.0,
                    percentile: 95,
                },
                PercentileBand {
                    min_score: 70.0,
                    percentile: 90,
                },
                PercentileBand {
                    min_score: 60.0,
                    percentile: 75,
                },
                PercentileBand {
                    min_score: 50.0,
                    percentile: 50,
                },
            ],
            floor: 25,
        }
    }
}

impl PercentileBands {
    pub fn bucket(&self, score: f64) -> u8 {
        self.bands
            .iter()
            .filter(|band| score >= band.min_score)
            .map(|band| band.percentile)
            .max()
            .unwrap_or(self.floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievements::domain::SkillSnapshot;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn day(offset: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date") + chrono::Days::new(offset.into())
    }

    fn performance(offset: u32, stats: &str) -> MatchPerformance {
        MatchPerformance {
            played_on: day(offset),
            played: true,
            result: MatchResult::Loss,
            rating: None,
            stats: stats.to_string(),
        }
    }

    fn sleep_entry(offset: u32, sleep: f64) -> WellnessEntry {
        WellnessEntry {
            recorded_on: day(offset),
            metrics: BTreeMap::from([("sleepQuality".to_string(), sleep)]),
        }
    }

    #[test]
    fn streak_fails_when_one_record_in_window_misses() {
        let entries = [8.0, 8.0, 6.0, 8.0, 8.0];
        let outcome = streak(&entries, 5, |value| *value >= 7.0);

        assert!(!outcome.satisfied);
        assert_eq!(outcome.run_length, 2);
    }

    #[test]
    fn streak_requires_a_full_window_of_records() {
        let entries = [8.0, 8.0, 8.0, 8.0];
        let outcome = streak(&entries, 5, |value| *value >= 7.0);

        assert!(!outcome.satisfied);
        assert_eq!(outcome.available, 4);
        assert_eq!(outcome.run_length, 4);
    }

    #[test]
    fn streak_passes_on_full_window_and_ignores_older_records() {
        let entries = [8.0, 9.0, 7.0, 7.5, 8.0, 2.0];
        let outcome = streak(&entries, 5, |value| *value >= 7.0);

        assert!(outcome.satisfied);
        assert_eq!(outcome.run_length, 5);
        assert!(!streak(&entries, 0, |_| true).satisfied);
    }

    #[test]
    fn running_average_ignores_absent_values() {
        assert_eq!(
            running_average([Some(6.0), None, Some(0.0), Some(8.0)]),
            Some(7.0)
        );
        assert_eq!(running_average([None, Some(0.0)]), None);
    }

    #[test]
    fn best_of_skips_malformed_payloads() {
        let matches = vec![
            performance(0, r#"{"runs": 34}"#),
            performance(1, "{not json"),
            performance(2, r#"{"runs": "52"}"#),
            performance(3, "[1, 2]"),
            performance(4, ""),
        ];

        assert_eq!(best_of(&matches, "runs"), Some(52.0));
        assert_eq!(best_of(&matches, "wickets"), None);
    }

    #[test]
    fn match_count_categories() {
        let mut won = performance(0, r#"{"catches": 2}"#);
        won.result = MatchResult::Win;
        let mut benched = performance(1, r#"{"catches": 1}"#);
        benched.played = false;
        let matches = vec![
            won,
            benched,
            performance(2, r#"{"runOuts": "1"}"#),
            performance(3, r#"{"runs": 10}"#),
        ];

        assert_eq!(match_count(&matches, MatchCategory::Played), 3);
        assert_eq!(match_count(&matches, MatchCategory::Won), 1);
        assert_eq!(match_count(&matches, MatchCategory::Fielding), 2);
    }

    #[test]
    fn wellness_all_metrics_requires_every_metric() {
        let mut complete = BTreeMap::new();
        for metric in WellnessMetric::ALL {
            complete.insert(metric.field_name().to_string(), 3.0);
        }
        let full = WellnessEntry {
            recorded_on: day(0),
            metrics: complete.clone(),
        };
        complete.insert("stress".to_string(), 0.0);
        let partial = WellnessEntry {
            recorded_on: day(1),
            metrics: complete,
        };

        let any = Comparison::Gte(0.0);
        assert!(wellness_entry_passes(&full, &WellnessField::AllMetrics, &any));
        assert!(!wellness_entry_passes(&partial, &WellnessField::AllMetrics, &any));
        assert!(wellness_entry_passes(
            &sleep_entry(2, 8.0),
            &WellnessField::Metric("sleepQuality".to_string()),
            &Comparison::Gte(7.0)
        ));
    }

    #[test]
    fn fitness_composite_renormalises_over_measured_fields() {
        let bundle = AthleteDataBundle {
            snapshot: SkillSnapshot::from_metrics([
                ("enduranceScore", 80.0),
                ("agilityScore", 60.0),
            ]),
            ..AthleteDataBundle::default()
        };

        let composite = fitness_composite(&bundle).expect("composite");
        assert!((composite - 72.0).abs() < 1e-9);
        assert_eq!(fitness_composite(&AthleteDataBundle::default()), None);
    }

    #[test]
    fn percentile_bands_are_coarse_buckets() {
        let bands = PercentileBands::default();

        assert_eq!(bands.bucket(85.0), 95);
        assert_eq!(bands.bucket(80.0), 95);
        assert_eq!(bands.bucket(72.0), 90);
        assert_eq!(bands.bucket(60.0), 75);
        assert_eq!(bands.bucket(55.0), 50);
        assert_eq!(bands.bucket(10.0), 25);
    }
}
