//! # QnA Labeler CLI (`qlab`)
//!
//! ## Usage
//!
//! ```bash
//! qlab --config ./config/qlab.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `qlab init` | Create the SQLite database and tables |
//! | `qlab reset --yes` | Drop and recreate both tables (destroys all labels) |
//! | `qlab ingest [DIR]` | Load transcript files from a directory |
//! | `qlab next --actor A` | Show a random unlabeled QnA pair |
//! | `qlab label ID relevant --actor A` | Label a QnA pair |
//! | `qlab stats [--actor A]` | Show labeling progress |
//! | `qlab get ID` | Show one QnA pair and its label state |
//! | `qlab serve` | Start the JSON HTTP API |

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use qna_labeler::progress::ProgressMode;
use qna_labeler::{config, db, get, ingest, labeling, migrate, server, stats};

/// QnA Labeler: ingest press-conference transcripts and label their
/// question/answer pairs for relevance.
#[derive(Parser)]
#[command(name = "qlab", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/qlab.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema. Safe to run repeatedly.
    Init,

    /// Drop and recreate all tables.
    ///
    /// Every ingested document and every label is deleted. Requires `--yes`.
    Reset {
        /// Confirm the destructive reset.
        #[arg(long)]
        yes: bool,
    },

    /// Ingest transcript files.
    ///
    /// Files already present (by filename) are skipped, so re-running over
    /// the same directory changes nothing.
    Ingest {
        /// Source directory. Defaults to `[ingest].root`.
        dir: Option<PathBuf>,

        /// Progress output on stderr. Defaults to `human` on a TTY, else `off`.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Show a random unlabeled QnA pair.
    Next {
        #[arg(long)]
        actor: String,
    },

    /// Label a QnA pair.
    Label {
        /// QnA item id.
        id: i64,

        #[arg(value_enum)]
        value: LabelArg,

        #[arg(long)]
        actor: String,
    },

    /// Show labeling progress, overall and per actor.
    Stats {
        /// Also show this actor's own counts.
        #[arg(long)]
        actor: Option<String>,
    },

    /// Show one QnA pair by id.
    Get { id: i64 },

    /// Start the JSON HTTP API on `[server].bind`.
    Serve,
}

#[derive(Clone, Copy, ValueEnum)]
enum LabelArg {
    Relevant,
    Irrelevant,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Reset { yes } => {
            if !yes {
                anyhow::bail!(
                    "reset deletes every document and label in {}; re-run with --yes to confirm",
                    cfg.db.path.display()
                );
            }
            let pool = db::connect(&cfg).await?;
            migrate::reset_tables(&pool).await?;
            pool.close().await;
            tracing::warn!(db = %cfg.db.path.display(), "tables dropped and recreated");
            println!("Tables reset successfully.");
        }
        Commands::Ingest { dir, progress } => {
            ingest::run_ingest(&cfg, dir, progress).await?;
        }
        Commands::Next { actor } => {
            labeling::run_next(&cfg, &actor).await?;
        }
        Commands::Label { id, value, actor } => {
            let relevant = matches!(value, LabelArg::Relevant);
            labeling::run_label(&cfg, id, relevant, &actor).await?;
        }
        Commands::Stats { actor } => {
            stats::run_stats(&cfg, actor.as_deref()).await?;
        }
        Commands::Get { id } => {
            get::run_get(&cfg, id).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
