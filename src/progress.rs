//! Push progress reporting.
//!
//! Reports what a `mdpush push` run is doing while it walks the catalog
//! pages, the local files, and the leftover remote records. Progress is
//! emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PushProgressEvent {
    /// A search page was merged into the remote index.
    Indexing { page: u64, records: u64 },
    /// Local file `n` of `total` is being reconciled.
    Reconciling { n: u64, total: u64 },
    /// Leftover remote record `n` of `total` is being deleted.
    Deleting { n: u64, total: u64 },
}

/// Reports push progress. Implementations write to stderr (human or JSON).
pub trait PushProgressReporter {
    fn report(&self, event: PushProgressEvent);
}

/// Human-friendly progress on stderr: "push  reconciling  12 / 1,204 files".
pub struct StderrProgress;

impl PushProgressReporter for StderrProgress {
    fn report(&self, event: PushProgressEvent) {
        let line = match &event {
            PushProgressEvent::Indexing { page, records } => format!(
                "push  indexing  page {}  {} records\n",
                format_number(*page),
                format_number(*records)
            ),
            PushProgressEvent::Reconciling { n, total } => format!(
                "push  reconciling  {} / {} files\n",
                format_number(*n),
                format_number(*total)
            ),
            PushProgressEvent::Deleting { n, total } => format!(
                "push  deleting  {} / {} records\n",
                format_number(*n),
                format_number(*total)
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl PushProgressReporter for JsonProgress {
    fn report(&self, event: PushProgressEvent) {
        let obj = match &event {
            PushProgressEvent::Indexing { page, records } => serde_json::json!({
                "event": "progress",
                "phase": "indexing",
                "page": page,
                "records": records
            }),
            PushProgressEvent::Reconciling { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "reconciling",
                "n": n,
                "total": total
            }),
            PushProgressEvent::Deleting { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "deleting",
                "n": n,
                "total": total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl PushProgressReporter for NoProgress {
    fn report(&self, _event: PushProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn PushProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(1), "1");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }
}
