//! rehearse - command-line reports for the rehearse scheduling engine.
//!
//! Prints the dashboard, forecasting, analytics and study-plan projections
//! for a user as pretty JSON, and imports cards from JSON Lines files.
//!
//! # Configuration
//!
//! - `--config <file>` - `.toml`, `.json` or `.yaml` configuration
//! - `--db <path>` - SQLite database, overriding the configured store
//! - `REHEARSE_DB_PATH`, `REHEARSE_STORE`, `REHEARSE_DEFAULT_ALGORITHM`,
//!   `REHEARSE_SESSION_LIMIT` - environment overrides
//! - `RUST_LOG` - log filter (logs go to stderr)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rehearse_core::{
    Algorithm, Card, CardFilter, RehearseConfig, ReviewScheduleManager, SpacedRepetitionScheduler,
    StoreProvider, SystemClock,
};
use rehearse_stores::RepositoryFactory;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "rehearse", version, about = "Spaced-repetition schedule reports")]
struct Cli {
    /// Configuration file (.toml, .json or .yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path (implies the sqlite store)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Workload, per-algorithm and retention overview
    Dashboard { user: String },

    /// Cards due now, most overdue first
    Due {
        user: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Only cards using this algorithm (sm2, leitner)
        #[arg(long)]
        algorithm: Option<String>,
    },

    /// Daily due counts starting today
    Upcoming {
        user: String,
        #[arg(long, default_value_t = 7)]
        days: u32,
    },

    /// Compare the upcoming workload with a daily target
    Optimize {
        user: String,
        #[arg(long)]
        target: u32,
    },

    /// Accuracy and learning curve over recent days
    Analytics {
        user: String,
        #[arg(long, default_value_t = 30)]
        days: u32,
    },

    /// Pick the cards most worth reviewing in the time available
    Plan {
        user: String,
        #[arg(long)]
        minutes: u32,
    },

    /// Import cards from a JSON Lines file (one card per line)
    Import { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let output = run(cli).await?;
    println!("{}", output);
    Ok(())
}

fn load_config(cli: &Cli) -> Result<RehearseConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = RehearseConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.apply_env()?;
            config
        }
        None => RehearseConfig::from_env()?,
    };

    if let Some(db) = &cli.db {
        config.store.provider = StoreProvider::Sqlite;
        config.store.db_path = db.clone();
    }

    Ok(config)
}

async fn run(cli: Cli) -> Result<String> {
    let config = load_config(&cli)?;
    let repository = RepositoryFactory::create(&config.store)?;
    let scheduler = Arc::new(SpacedRepetitionScheduler::new(
        repository,
        Arc::new(SystemClock),
        config,
    ));
    let manager = ReviewScheduleManager::new(Arc::clone(&scheduler));

    let value = match cli.command {
        Command::Dashboard { user } => serde_json::to_value(manager.get_review_dashboard(&user).await?)?,
        Command::Due {
            user,
            limit,
            algorithm,
        } => {
            let filter = match algorithm {
                Some(name) => CardFilter::any().with_algorithm(Algorithm::parse(&name)?),
                None => CardFilter::any(),
            };
            serde_json::to_value(scheduler.get_due_cards(&user, limit, Some(&filter)).await?)?
        }
        Command::Upcoming { user, days } => {
            serde_json::to_value(manager.get_upcoming_reviews(&user, days).await?)?
        }
        Command::Optimize { user, target } => {
            serde_json::to_value(manager.optimize_daily_schedule(&user, target).await?)?
        }
        Command::Analytics { user, days } => {
            serde_json::to_value(manager.get_learning_analytics(&user, days).await?)?
        }
        Command::Plan { user, minutes } => {
            serde_json::to_value(manager.suggest_study_plan(&user, minutes).await?)?
        }
        Command::Import { file } => {
            let imported = import_cards(&scheduler, &file).await?;
            serde_json::json!({ "imported": imported })
        }
    };

    Ok(serde_json::to_string_pretty(&value)?)
}

async fn import_cards(scheduler: &SpacedRepetitionScheduler, file: &Path) -> Result<usize> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let mut imported = 0;
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let card: Card = serde_json::from_str(line)
            .with_context(|| format!("Invalid card on line {}", index + 1))?;
        scheduler
            .repository()
            .insert(card)
            .await
            .with_context(|| format!("Failed to store card on line {}", index + 1))?;
        imported += 1;
    }

    tracing::info!(imported, file = %file.display(), "Imported cards");
    Ok(imported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["rehearse", "plan", "alice", "--minutes", "15", "--db", "/tmp/x.db"]);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        match cli.command {
            Command::Plan { user, minutes } => {
                assert_eq!(user, "alice");
                assert_eq!(minutes, 15);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_db_flag_selects_sqlite() {
        let cli = Cli::parse_from(["rehearse", "--db", "cards.db", "dashboard", "alice"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.store.provider, StoreProvider::Sqlite);
        assert_eq!(config.store.db_path, PathBuf::from("cards.db"));
    }

    #[tokio::test]
    async fn test_import_then_dashboard() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = dir.path().join("cards.db");
        let cards = dir.path().join("cards.jsonl");

        let mut file = std::fs::File::create(&cards).unwrap();
        for algorithm in [Algorithm::Sm2, Algorithm::Leitner, Algorithm::Sm2] {
            let card = Card::new("alice", algorithm, Utc::now());
            writeln!(file, "{}", serde_json::to_string(&card).unwrap()).unwrap();
        }
        writeln!(file).unwrap();

        let db_arg = db.to_str().unwrap();
        let import = Cli::parse_from(["rehearse", "--db", db_arg, "import", cards.to_str().unwrap()]);
        let output = run(import).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["imported"], 3);

        let dashboard = Cli::parse_from(["rehearse", "--db", db_arg, "dashboard", "alice"]);
        let value: serde_json::Value = serde_json::from_str(&run(dashboard).await.unwrap()).unwrap();
        assert_eq!(value["status_counts"]["total"], 3);
        assert_eq!(value["algorithm_stats"]["leitner"]["card_count"], 1);

        let due = Cli::parse_from(["rehearse", "--db", db_arg, "due", "alice", "--algorithm", "sm2"]);
        let value: serde_json::Value = serde_json::from_str(&run(due).await.unwrap()).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_import_rejects_card_breaking_invariants() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = dir.path().join("cards.db");
        let cards = dir.path().join("cards.jsonl");

        let good = Card::new("alice", Algorithm::Sm2, Utc::now());
        let mut bad = Card::new("alice", Algorithm::Sm2, Utc::now());
        bad.total_reviews = 2;
        bad.correct_reviews = 5;
        std::fs::write(
            &cards,
            format!(
                "{}\n{}\n",
                serde_json::to_string(&good).unwrap(),
                serde_json::to_string(&bad).unwrap()
            ),
        )
        .unwrap();

        let db_arg = db.to_str().unwrap();
        let import = Cli::parse_from(["rehearse", "--db", db_arg, "import", cards.to_str().unwrap()]);
        let err = run(import).await.unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("line 2"));
        assert!(message.contains("correct_reviews"));

        let dashboard = Cli::parse_from(["rehearse", "--db", db_arg, "dashboard", "alice"]);
        let value: serde_json::Value = serde_json::from_str(&run(dashboard).await.unwrap()).unwrap();
        assert_eq!(value["status_counts"]["total"], 1);
    }

    #[tokio::test]
    async fn test_import_reports_bad_line() {
        let dir = tempfile::TempDir::new().unwrap();
        let cards = dir.path().join("bad.jsonl");
        std::fs::write(&cards, "{\"not\": \"a card\"}\n").unwrap();

        let cli = Cli::parse_from([
            "rehearse",
            "--db",
            dir.path().join("cards.db").to_str().unwrap(),
            "import",
            cards.to_str().unwrap(),
        ]);
        let err = run(cli).await.unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }
}
