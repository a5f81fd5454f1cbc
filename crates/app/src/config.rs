use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

/// Track a learner's progress through tutoring tasks.
#[derive(Debug, Parser)]
#[command(name = "tutor", version)]
pub struct Cli {
    /// SQLite database URL or path.
    #[arg(long = "db", env = "TUTOR_DB_URL", default_value = "sqlite://tutor.sqlite3")]
    pub db_url: String,

    /// File holding this device's learner session token.
    #[arg(long, env = "TUTOR_SESSION_FILE", default_value = ".tutor-session")]
    pub session_file: PathBuf,

    /// Use this session id instead of the token file.
    #[arg(long = "session", env = "TUTOR_SESSION_ID")]
    pub session_id: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show (and lazily create) progress for a task.
    Status {
        #[arg(long = "task", env = "TUTOR_TASK_ID")]
        task_id: String,
    },
    /// Record that the learner passed the task's quiz.
    QuizPassed {
        #[arg(long = "task", env = "TUTOR_TASK_ID")]
        task_id: String,
    },
    /// Record one finished exercise.
    Exercise {
        #[arg(long = "task", env = "TUTOR_TASK_ID")]
        task_id: String,
    },
    /// Summarise all tasks of the current session.
    Report,
}

/// Turn a bare path or `sqlite:` URL into an absolute `sqlite://` URL.
pub fn normalize_sqlite_url(raw: &str, cwd: &Path) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file (and its directory) so the pool can open it.
pub fn prepare_sqlite_file(db_url: &str) -> Result<()> {
    if db_url == "sqlite::memory:" || db_url.contains("mode=memory") {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid --db value: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid --db value: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating database directory {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating database file {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_become_absolute_urls() {
        let url = normalize_sqlite_url("data/tutor.db", Path::new("/srv/app"));
        assert_eq!(url, "sqlite:///srv/app/data/tutor.db");
    }

    #[test]
    fn sqlite_prefix_is_stripped() {
        let url = normalize_sqlite_url("sqlite:tutor.db", Path::new("/tmp"));
        assert_eq!(url, "sqlite:///tmp/tutor.db");
    }

    #[test]
    fn full_urls_are_kept() {
        assert_eq!(
            normalize_sqlite_url("sqlite:///var/tutor.db", Path::new("/tmp")),
            "sqlite:///var/tutor.db"
        );
        assert_eq!(
            normalize_sqlite_url("sqlite::memory:", Path::new("/tmp")),
            "sqlite::memory:"
        );
    }

    #[test]
    fn prepare_rejects_non_sqlite_urls() {
        assert!(prepare_sqlite_file("postgres://localhost/db").is_err());
    }

    #[test]
    fn cli_parses_subcommand_and_flags() {
        let cli = Cli::try_parse_from([
            "tutor",
            "--db",
            "sqlite::memory:",
            "--session",
            "device-1",
            "exercise",
            "--task",
            "task-1",
        ])
        .unwrap();
        assert_eq!(cli.db_url, "sqlite::memory:");
        assert_eq!(cli.session_id.as_deref(), Some("device-1"));
        assert!(matches!(cli.command, Command::Exercise { ref task_id } if task_id == "task-1"));
    }
}
