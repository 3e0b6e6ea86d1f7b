use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};

use super::batch::{BatchRunner, BatchSummary};
use super::domain::AthleteId;
use super::repository::AchievementStore;
use super::service::{AchievementService, AthleteEvaluation};
use crate::error::AppError;

pub(crate) struct RouterState<S> {
    service: Arc<AchievementService<S>>,
    batch_workers: usize,
}

impl<S> RouterState<S> {
    pub(crate) fn new(service: Arc<AchievementService<S>>, batch_workers: usize) -> Self {
        Self {
            service,
            batch_workers: batch_workers.max(1),
        }
    }
}

impl<S> Clone for RouterState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            batch_workers: self.batch_workers,
        }
    }
}

/// Routes triggering evaluations; the caller decides when to hit them.
pub fn achievement_router<S>(service: Arc<AchievementService<S>>, batch_workers: usize) -> Router
where
    S: AchievementStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/athletes/:athlete_id/achievements/evaluate",
            post(evaluate_handler::<S>),
        )
        .route(
            "/api/v1/achievements/evaluate-all",
            post(evaluate_all_handler::<S>),
        )
        .with_state(RouterState::new(service, batch_workers))
}

pub(crate) async fn evaluate_handler<S>(
    State(state): State<RouterState<S>>,
    Path(athlete_id): Path<String>,
) -> Result<Json<AthleteEvaluation>, AppError>
where
    S: AchievementStore + 'static,
{
    let evaluation = state.service.evaluate_athlete(&AthleteId(athlete_id))?;
    Ok(Json(evaluation))
}

pub(crate) async fn evaluate_all_handler<S>(
    State(state): State<RouterState<S>>,
) -> Result<Json<BatchSummary>, AppError>
where
    S: AchievementStore + 'static,
{
    let runner = BatchRunner::new(Arc::clone(&state.service));
    let summary = runner.evaluate_all_concurrent(state.batch_workers).await?;
    Ok(Json(summary))
}
