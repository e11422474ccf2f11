//! Run log.
//!
//! Log events go to stderr and are appended to `<dirs.log>/mdpush.log`.
//! `RUST_LOG` overrides the default filter. After each run the file is cut
//! back to its most recent [`MAX_LOG_LINES`] lines.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const MAX_LOG_LINES: usize = 400;

const DEFAULT_FILTER: &str = "metadata_push=info,mdpush=info";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(log_file: &Path) -> Result<()> {
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("failed to open log file {}", log_file.display()))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()?;
    Ok(())
}

/// Keep only the last `max_lines` lines of the log file. A missing file is
/// left alone.
pub fn trim_log_file(path: &Path, max_lines: usize) -> Result<()> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read log file {}", path.display()))
        }
    };

    let lines: Vec<&str> = content.lines().collect();
    if lines.len() <= max_lines {
        return Ok(());
    }
    let mut kept = lines[lines.len() - max_lines..].join("\n");
    kept.push('\n');
    std::fs::write(path, kept)
        .with_context(|| format!("failed to write log file {}", path.display()))
}
