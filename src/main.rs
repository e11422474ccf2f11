//! # Metadata Push CLI (`mdpush`)
//!
//! ## Usage
//!
//! ```bash
//! mdpush --config ./config/mdpush.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mdpush push` | Reconcile the catalog with the metadata directory |
//! | `mdpush check` | Validate the config and list the local records |
//! | `mdpush index` | List the catalog's records for the organisation |
//! | `mdpush rewrite <file>` | Print a file with its contacts rewritten |
//!
//! ## Examples
//!
//! ```bash
//! # See what a run would do
//! mdpush push --dry-run --config ./config/mdpush.toml
//!
//! # Nightly run from cron, no progress output
//! mdpush push --progress off --config /etc/mdpush.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;

use metadata_push::config;
use metadata_push::inspect;
use metadata_push::logging;
use metadata_push::progress::ProgressMode;
use metadata_push::push;

/// Metadata Push: keep a CSW catalog in step with a directory of ISO 19139
/// records.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/mdpush.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "mdpush",
    about = "Push a directory of ISO 19139 metadata records into a CSW catalog",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/mdpush.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the catalog with the metadata directory.
    ///
    /// Inserts new records, replaces records with a newer local dateStamp
    /// and deletes the organisation's records that no longer exist locally.
    Push {
        /// Classify and count only; no insert, update or delete is sent.
        #[arg(long)]
        dry_run: bool,

        /// Progress output on stderr. Defaults to `human` on a TTY.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Validate the configuration and list the local records.
    Check,

    /// List the catalog's records for the organisation.
    Index,

    /// Print a file with its responsible parties rewritten.
    ///
    /// Requires a `[contact]` section.
    Rewrite {
        /// Metadata file to rewrite.
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    // The rewrite output goes to stdout; keep it free of log lines.
    if !matches!(cli.command, Commands::Rewrite { .. }) {
        logging::init_logging(&cfg.log_file())?;
    }

    let result = match cli.command {
        Commands::Push { dry_run, progress } => {
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            push::run_push(&cfg, dry_run, mode).map(|_| ())
        }
        Commands::Check => inspect::run_check(&cfg),
        Commands::Index => inspect::run_index(&cfg),
        Commands::Rewrite { path } => inspect::run_rewrite(&cfg, &path),
    };

    if let Err(e) = logging::trim_log_file(&cfg.log_file(), logging::MAX_LOG_LINES) {
        warn!("could not trim the log file: {:#}", e);
    }
    result
}
