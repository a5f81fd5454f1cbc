use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use services::{AppServices, Clock, FileSessionIdentity, FixedSessionIdentity, SessionIdentity};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use tutor_core::model::{SessionId, TaskId, TaskProgress};

mod config;

use config::{Cli, Command};

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TUTOR_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn identity(cli: &Cli) -> Result<Box<dyn SessionIdentity>> {
    if let Some(raw) = &cli.session_id {
        let session_id = SessionId::new(raw.as_str()).context("invalid --session value")?;
        return Ok(Box::new(FixedSessionIdentity::new(session_id)));
    }
    let identity = FileSessionIdentity::load_or_create(&cli.session_file)?;
    tracing::debug!(path = %identity.path().display(), "session token loaded");
    Ok(Box::new(identity))
}

fn progress_json(progress: Option<&TaskProgress>) -> serde_json::Value {
    match progress {
        Some(p) => json!({
            "progress": p,
            "phase": p.derived_phase(),
            "exercises_remaining": p.exercises_remaining(),
        }),
        None => json!({ "progress": null, "reason": "no session" }),
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("reading current directory")?;
    let db_url = config::normalize_sqlite_url(&cli.db_url, &cwd);

    config::prepare_sqlite_file(&db_url)?;
    let services = AppServices::new_sqlite(&db_url, Clock::default()).await?;
    let identity = identity(&cli)?;
    tracing::debug!(%db_url, "services ready");

    let tracker_for = |task_id: &str| -> Result<_> {
        Ok(services.tracker(identity.as_ref(), Some(TaskId::new(task_id)?)))
    };

    let output = match &cli.command {
        Command::Status { task_id } => {
            let mut tracker = tracker_for(task_id.as_str())?;
            let progress = tracker.fetch_progress(None).await?;
            progress_json(progress.as_ref())
        }
        Command::QuizPassed { task_id } => {
            let mut tracker = tracker_for(task_id.as_str())?;
            let progress = tracker.mark_quiz_passed(None).await?;
            progress_json(progress.as_ref())
        }
        Command::Exercise { task_id } => {
            let mut tracker = tracker_for(task_id.as_str())?;
            match tracker.increment_exercise(None).await? {
                Some(count) => json!({
                    "exercises_completed": count,
                    "phase": tracker.current_phase(),
                }),
                None => progress_json(None),
            }
        }
        Command::Report => {
            let session = identity.session_id();
            match services.progress().session_report(session.as_ref()).await? {
                Some(report) => json!({
                    "session_id": report.session_id,
                    "completion_ratio": report.report.completion_ratio(),
                    "summary": report.report,
                    "tasks": report.tasks,
                }),
                None => progress_json(None),
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // Binary glue: report once and exit.
        tracing::error!("{err:#}");
        std::process::exit(2);
    }
}
