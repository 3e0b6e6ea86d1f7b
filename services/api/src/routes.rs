use crate::infra::AppState;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use badge_engine::achievements::{
    achievement_router, AchievementService, AwardId, AwardedBadge, InMemoryAchievementStore,
};
use badge_engine::error::AppError;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
pub(crate) struct RevokeRequest {
    pub(crate) revoked_by: String,
    pub(crate) reason: String,
}

pub(crate) fn with_host_routes(
    service: Arc<AchievementService<InMemoryAchievementStore>>,
    store: Arc<InMemoryAchievementStore>,
    batch_workers: usize,
) -> axum::Router {
    achievement_router(service, batch_workers)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/awards/:award_id/revoke",
            axum::routing::post(revoke_endpoint).layer(Extension(store)),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn revoke_endpoint(
    Extension(store): Extension<Arc<InMemoryAchievementStore>>,
    Path(award_id): Path<String>,
    Json(request): Json<RevokeRequest>,
) -> Result<Json<AwardedBadge>, AppError> {
    let award = store.revoke(
        &AwardId(award_id),
        &request.revoked_by,
        &request.reason,
        Utc::now(),
    )?;
    info!(
        award_id = %award.id.0,
        athlete_id = %award.athlete_id,
        badge_id = %award.badge_id,
        revoked_by = %request.revoked_by,
        "award revoked"
    );
    Ok(Json(award))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{build_service, demo_store};
    use axum::body::Body;
    use axum::http::Request;
    use badge_engine::config::EngineConfig;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::Value;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(ready: bool) -> axum::Router {
        let store = Arc::new(demo_store().expect("demo seed"));
        let engine = EngineConfig {
            batch_workers: 2,
            match_lookback: 50,
            wellness_lookback: 60,
        };
        let service = Arc::new(build_service(Arc::clone(&store), &engine));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };

        with_host_routes(service, store, engine.batch_workers).layer(Extension(state))
    }

    fn post(uri: &str, body: Body) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .expect("request builds")
    }

    async fn read_json_body(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    #[tokio::test]
    async fn health_and_readiness_report_status() {
        let router = app(false);

        let health = router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        assert_eq!(health.status(), StatusCode::OK);

        let ready = router
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        assert_eq!(ready.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(read_json_body(ready).await["status"], "initializing");
    }

    #[tokio::test]
    async fn metrics_endpoint_serves_prometheus_text() {
        let response = app(true)
            .oneshot(Request::get("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn evaluate_then_revoke_then_re_earn() {
        let router = app(true);

        let evaluated = router
            .clone()
            .oneshot(post(
                "/api/v1/athletes/ath-003/achievements/evaluate",
                Body::empty(),
            ))
            .await
            .expect("route executes");
        assert_eq!(evaluated.status(), StatusCode::OK);
        let payload = read_json_body(evaluated).await;
        assert_eq!(payload["newly_awarded"], json!(["pushups-10"]));

        let revoke_body = serde_json::to_vec(&json!({
            "revoked_by": "coach-01",
            "reason": "score entered twice"
        }))
        .expect("serialise body");
        let revoked = router
            .clone()
            .oneshot(post(
                "/api/v1/awards/award-000001/revoke",
                Body::from(revoke_body.clone()),
            ))
            .await
            .expect("route executes");
        assert_eq!(revoked.status(), StatusCode::OK);
        let payload = read_json_body(revoked).await;
        assert_eq!(payload["revocation"]["revoked"], true);
        assert_eq!(payload["revocation"]["reason"], "score entered twice");

        let again = router
            .clone()
            .oneshot(post(
                "/api/v1/awards/award-000001/revoke",
                Body::from(revoke_body),
            ))
            .await
            .expect("route executes");
        assert_eq!(again.status(), StatusCode::NOT_FOUND);

        let re_earned = router
            .oneshot(post(
                "/api/v1/athletes/ath-003/achievements/evaluate",
                Body::empty(),
            ))
            .await
            .expect("route executes");
        let payload = read_json_body(re_earned).await;
        assert_eq!(payload["newly_awarded"], json!(["pushups-10"]));
    }

    #[tokio::test]
    async fn evaluate_all_runs_the_demo_roster() {
        let response = app(true)
            .oneshot(post("/api/v1/achievements/evaluate-all", Body::empty()))
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        assert_eq!(payload["evaluated"], 3);
        assert_eq!(payload["new_awards"], 6);
    }
}
