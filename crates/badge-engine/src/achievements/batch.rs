use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::AthleteId;
use super::repository::AchievementStore;
use super::service::{AchievementService, AthleteEvaluation, EvaluationError};

/// Counts and failures of one pass over every athlete.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Athletes whose evaluation completed.
    pub evaluated: usize,
    pub new_awards: usize,
    pub errors: Vec<BatchFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub athlete_id: AthleteId,
    pub message: String,
}

impl BatchSummary {
    fn record(
        &mut self,
        athlete_id: &AthleteId,
        result: Result<AthleteEvaluation, EvaluationError>,
    ) {
        match result {
            Ok(evaluation) => {
                self.evaluated += 1;
                self.new_awards += evaluation.newly_awarded.len();
            }
            Err(error) => {
                warn!(athlete_id = %athlete_id, %error, "athlete evaluation failed");
                self.fail(athlete_id, error.to_string());
            }
        }
    }

    fn fail(&mut self, athlete_id: &AthleteId, message: String) {
        self.errors.push(BatchFailure {
            athlete_id: athlete_id.clone(),
            message,
        });
    }

    fn merge(&mut self, other: BatchSummary) {
        self.evaluated += other.evaluated;
        self.new_awards += other.new_awards;
        self.errors.extend(other.errors);
    }

    fn finish(mut self) -> Self {
        self.errors.sort_by(|a, b| a.athlete_id.cmp(&b.athlete_id));
        info!(
            evaluated = self.evaluated,
            new_awards = self.new_awards,
            failures = self.errors.len(),
            "badge batch evaluation finished"
        );
        self
    }
}

/// Runs the achievement service over every athlete with data.
///
/// A failing athlete is recorded and skipped; only failing to list the
/// athletes aborts the run.
pub struct BatchRunner<S> {
    service: Arc<AchievementService<S>>,
}

impl<S> BatchRunner<S>
where
    S: AchievementStore + 'static,
{
    pub fn new(service: Arc<AchievementService<S>>) -> Self {
        Self { service }
    }

    pub fn evaluate_all(&self) -> Result<BatchSummary, EvaluationError> {
        self.evaluate_all_at(Utc::now())
    }

    pub fn evaluate_all_at(&self, now: DateTime<Utc>) -> Result<BatchSummary, EvaluationError> {
        let athletes = self.service.store().athletes_with_data()?;
        Ok(evaluate_chunk(&self.service, &athletes, now).finish())
    }

    /// Spread athletes across `workers` blocking tasks and merge their summaries.
    pub async fn evaluate_all_concurrent(
        &self,
        workers: usize,
    ) -> Result<BatchSummary, EvaluationError> {
        let now = Utc::now();
        let athletes = self.service.store().athletes_with_data()?;
        if athletes.is_empty() {
            return Ok(BatchSummary::default().finish());
        }

        let chunk_size = athletes.len().div_ceil(workers.max(1));
        let mut handles = Vec::new();
        for chunk in athletes.chunks(chunk_size) {
            let chunk = chunk.to_vec();
            let service = Arc::clone(&self.service);
            let worker_chunk = chunk.clone();
            let handle = tokio::task::spawn_blocking(move || {
                evaluate_chunk(&service, &worker_chunk, now)
            });
            handles.push((chunk, handle));
        }

        let mut summary = BatchSummary::default();
        for (chunk, handle) in handles {
            match handle.await {
                Ok(partial) => summary.merge(partial),
                Err(error) => {
                    warn!(%error, athletes = chunk.len(), "batch worker did not complete");
                    for athlete_id in &chunk {
                        summary.fail(athlete_id, format!("batch worker failed: {error}"));
                    }
                }
            }
        }

        Ok(summary.finish())
    }
}

fn evaluate_chunk<S>(
    service: &AchievementService<S>,
    athletes: &[AthleteId],
    now: DateTime<Utc>,
) -> BatchSummary
where
    S: AchievementStore + 'static,
{
    let mut summary = BatchSummary::default();
    for athlete_id in athletes {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            service.evaluate_athlete_at(athlete_id, now)
        }));
        match outcome {
            Ok(result) => summary.record(athlete_id, result),
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|message| message.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!(athlete_id = %athlete_id, %message, "athlete evaluation panicked");
                summary.fail(athlete_id, format!("evaluation panicked: {message}"));
            }
        }
    }
    summary
}
