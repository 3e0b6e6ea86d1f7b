use crate::infra::{build_service, parse_timestamp, SeedArgs};
use badge_engine::achievements::{
    AchievementStore, AthleteEvaluation, AthleteId, BatchRunner, BatchSummary,
    InMemoryAchievementStore, ProgressReport,
};
use badge_engine::config::AppConfig;
use badge_engine::error::AppError;
use badge_engine::telemetry;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Athlete to evaluate
    #[arg(long)]
    pub(crate) athlete: String,
    #[command(flatten)]
    pub(crate) seed: SeedArgs,
    /// Award timestamp (RFC 3339). Defaults to now.
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) at: Option<DateTime<Utc>>,
    /// Print the evaluation as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct BatchArgs {
    #[command(flatten)]
    pub(crate) seed: SeedArgs,
    /// Override BADGE_BATCH_WORKERS
    #[arg(long)]
    pub(crate) workers: Option<usize>,
    /// Print the summary as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let store = Arc::new(args.seed.load_store()?);
    let service = build_service(Arc::clone(&store), &config.engine);
    let athlete_id = AthleteId(args.athlete);
    let evaluation =
        service.evaluate_athlete_at(&athlete_id, args.at.unwrap_or_else(Utc::now))?;

    if args.json {
        print_json(&evaluation)?;
    } else {
        let name = store
            .athlete(&athlete_id)?
            .map(|athlete| athlete.name)
            .unwrap_or_else(|| athlete_id.0.clone());
        print!("{}", render_evaluation(&name, &evaluation));
    }
    Ok(())
}

pub(crate) async fn run_batch(args: BatchArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let store: Arc<InMemoryAchievementStore> = Arc::new(args.seed.load_store()?);
    let service = Arc::new(build_service(store, &config.engine));
    let workers = args.workers.unwrap_or(config.engine.batch_workers);
    let summary = BatchRunner::new(service)
        .evaluate_all_concurrent(workers)
        .await?;

    if args.json {
        print_json(&summary)?;
    } else {
        print!("{}", render_batch(&summary));
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{rendered}");
    Ok(())
}

pub(crate) fn render_evaluation(name: &str, evaluation: &AthleteEvaluation) -> String {
    let mut out = format!("Badge progress for {name} ({})\n", evaluation.athlete_id);
    if evaluation.progress.is_empty() {
        out.push_str("  no badges apply to this athlete\n");
        return out;
    }

    for report in &evaluation.progress {
        out.push_str(&render_report_line(
            report,
            evaluation.newly_awarded.contains(&report.badge_id),
        ));
    }
    out.push_str(&format!(
        "{} earned, {} in progress, {} new\n",
        evaluation.earned().count(),
        evaluation.in_progress().count(),
        evaluation.newly_awarded.len()
    ));
    out
}

fn render_report_line(report: &ProgressReport, is_new: bool) -> String {
    let marker = if report.earned { "x" } else { " " };
    let mut line = format!(
        "  [{marker}] {:<20} {:<12} {:>3}%",
        report.name,
        report.level.label(),
        report.progress
    );
    if let Some(earned_at) = report.earned_at {
        line.push_str(&format!("  earned {}", earned_at.format("%Y-%m-%d")));
    }
    if is_new {
        line.push_str("  (new)");
    }
    line.push('\n');
    line
}

pub(crate) fn render_batch(summary: &BatchSummary) -> String {
    let mut out = format!(
        "Evaluated {} athlete(s); {} new award(s); {} failure(s)\n",
        summary.evaluated,
        summary.new_awards,
        summary.errors.len()
    );
    for failure in &summary.errors {
        out.push_str(&format!("  {}: {}\n", failure.athlete_id, failure.message));
    }
    out
}
