use crate::infra::SeedArgs;
use crate::report::{run_batch, run_evaluate, BatchArgs, EvaluateArgs};
use crate::server;
use badge_engine::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Badge Engine",
    about = "Evaluate athlete achievement badges from the command line or over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Evaluate every visible badge for one athlete
    Evaluate(EvaluateArgs),
    /// Evaluate every athlete with recorded data
    Batch(BatchArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) seed: SeedArgs,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Evaluate(args) => run_evaluate(args),
        Command::Batch(args) => run_batch(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parses_evaluate_with_fixture() {
        let cli = Cli::try_parse_from([
            "badge-engine-api",
            "evaluate",
            "--athlete",
            "ath-001",
            "--fixture",
            "seed.json",
            "--at",
            "2025-06-30T09:00:00Z",
        ])
        .expect("arguments parse");

        match cli.command {
            Some(Command::Evaluate(args)) => {
                assert_eq!(args.athlete, "ath-001");
                assert_eq!(args.seed.fixture, Some(PathBuf::from("seed.json")));
                assert!(args.at.is_some());
                assert!(!args.json);
            }
            other => panic!("expected evaluate command, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_timestamp() {
        let result = Cli::try_parse_from([
            "badge-engine-api",
            "evaluate",
            "--athlete",
            "ath-001",
            "--at",
            "last tuesday",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["badge-engine-api"]).expect("arguments parse");
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["badge-engine-api", "batch", "--workers", "6"])
            .expect("arguments parse");
        assert!(matches!(
            cli.command,
            Some(Command::Batch(BatchArgs {
                workers: Some(6),
                ..
            }))
        ));
    }
}
