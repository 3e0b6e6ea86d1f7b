use badge_engine::achievements::{AchievementService, InMemoryAchievementStore};
use badge_engine::config::EngineConfig;
use badge_engine::error::AppError;
use chrono::{DateTime, Utc};
use clap::Args;
use metrics_exporter_prometheus::PrometheusHandle;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

const DEMO_SEED: &str = include_str!("../fixtures/demo_seed.json");

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Args, Debug, Default, Clone)]
pub(crate) struct SeedArgs {
    /// JSON store seed (athletes, badges, matches, wellness, awards). Defaults to the demo seed.
    #[arg(long)]
    pub(crate) fixture: Option<PathBuf>,
}

impl SeedArgs {
    pub(crate) fn load_store(&self) -> Result<InMemoryAchievementStore, AppError> {
        let store = match &self.fixture {
            Some(path) => {
                let reader = BufReader::new(File::open(path)?);
                let store = InMemoryAchievementStore::from_json_reader(reader)?;
                info!(fixture = %path.display(), "store seeded from fixture");
                store
            }
            None => demo_store()?,
        };
        Ok(store)
    }
}

pub(crate) fn demo_store() -> Result<InMemoryAchievementStore, AppError> {
    Ok(InMemoryAchievementStore::from_json_reader(
        DEMO_SEED.as_bytes(),
    )?)
}

pub(crate) fn build_service(
    store: Arc<InMemoryAchievementStore>,
    engine: &EngineConfig,
) -> AchievementService<InMemoryAchievementStore> {
    let evaluation = store.evaluation_config().clone();
    AchievementService::new(store, evaluation)
        .with_lookback(engine.history_lookback())
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|err| format!("failed to parse '{raw}' as an RFC 3339 timestamp ({err})"))
}
