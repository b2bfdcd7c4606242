use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use survivor_pool::cli::{Args, Command};
use survivor_pool::config::{Config, SeasonConfig};
use survivor_pool::logging::setup_logging;
use survivor_pool::pipeline::{Pipeline, RunMode, RunReport};
use survivor_pool::snapshot::{Snapshot, SnapshotStore};
use survivor_pool::web::{self, WebState};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Logging depends on config, so config errors can only go to stderr
    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(season) = args.season {
        config.season_file = Some(season);
    }
    if let Some(snapshot) = args.snapshot {
        config.snapshot_path = snapshot;
    }

    setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT_SHORT"),
        snapshot = %config.snapshot_path.display(),
        "starting survivor-pool"
    );

    let command = args.command.unwrap_or(Command::Scrape);
    match run(command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "Run failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: &Config) -> anyhow::Result<()> {
    match command {
        Command::Scrape => {
            let pipeline = build_pipeline(config)?;
            let report = pipeline.run(RunMode::Scrape).await?;
            log_summary(&report);
        }
        Command::Override { file } => {
            let snapshot = read_override(&file).await?;
            let pipeline = build_pipeline(config)?;
            let report = pipeline.run(RunMode::ManualOverride(snapshot)).await?;
            log_summary(&report);
        }
        Command::Show => {
            let store = SnapshotStore::new(&config.snapshot_path);
            let snapshot = store.load().await?.unwrap_or_default();
            let body =
                serde_json::to_string_pretty(&snapshot).context("Failed to serialize snapshot")?;
            println!("{body}");
        }
        Command::Serve { port } => {
            let state = WebState {
                store: SnapshotStore::new(&config.snapshot_path),
            };
            web::serve(state, port.unwrap_or(config.port)).await?;
        }
    }
    Ok(())
}

fn build_pipeline(config: &Config) -> anyhow::Result<Pipeline> {
    let season = SeasonConfig::load(config.season_file.as_deref())?;
    info!(
        season = %season.name,
        sources = season.sources.len(),
        cast = season.cast.len(),
        "Loaded season"
    );
    Pipeline::from_config(&season, config)
}

async fn read_override(path: &Path) -> anyhow::Result<Snapshot> {
    let body = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let jd = &mut serde_json::Deserializer::from_str(&body);
    let snapshot: Snapshot = serde_path_to_error::deserialize(jd)
        .with_context(|| format!("{} is not a valid snapshot", path.display()))?;
    Ok(snapshot)
}

fn log_summary(report: &RunReport) {
    let snapshot = &report.snapshot;
    let source = report.accepted().map(|a| a.source.as_str());
    let title = report.accepted().map(|a| a.title.as_str());

    info!(
        episode = snapshot.episode,
        eliminated = snapshot.eliminated.len(),
        merge = snapshot.milestones.merge.len(),
        jury = snapshot.milestones.jury.len(),
        winner = snapshot.milestones.winner.as_ref().map(|w| w.as_str()),
        status = %snapshot.scrape_status,
        source,
        title,
        attempts = report.attempts.len(),
        downgrades = report.downgrades.len(),
        anomalies = report.anomalies.len(),
        saved = report.saved,
        "Run finished"
    );
}
