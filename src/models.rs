//! Core data models used throughout a push run.
//!
//! These types represent the local records, the remote snapshot, and the
//! per-run result that flow through reconciliation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::extract;

/// One local metadata record, read once per run.
#[derive(Debug, Clone)]
pub struct MetadataDocument {
    /// File name, used in change-log lines.
    pub name: String,
    pub path: PathBuf,
    /// Raw XML text, starting at the `MD_Metadata` root element.
    pub text: String,
}

impl MetadataDocument {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            text: text.into(),
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        extract::identifier(&self.text)
    }

    pub fn modified_at(&self) -> Option<&str> {
        extract::modified_at(&self.text)
    }
}

/// Remote snapshot: identifier → modification stamp for every record of the
/// organisation. Built once at the start of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteIndex {
    records: BTreeMap<String, String>,
}

impl RemoteIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an identifier; a repeated identifier keeps the last stamp seen.
    /// A record without a readable stamp is stored with an empty one.
    pub fn insert(&mut self, identifier: &str, modified_at: Option<&str>) {
        self.records.insert(
            identifier.to_string(),
            modified_at.unwrap_or_default().to_string(),
        );
    }

    pub fn get(&self, identifier: &str) -> Option<&str> {
        self.records.get(identifier).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Entries in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge every record found in one page of search results.
    ///
    /// The page is cut at each `MD_Metadata` marker and each piece is
    /// searched for an identifier and a stamp. Pieces without an identifier
    /// are ignored. Returns the number of records merged.
    pub fn merge_page(&mut self, page: &str) -> usize {
        let mut merged = 0;
        for piece in page.split("MD_Metadata") {
            if let Some(identifier) = extract::identifier(piece) {
                self.insert(identifier, extract::modified_at(piece));
                merged += 1;
            }
        }
        merged
    }
}

/// What the run decided for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not in the catalog yet.
    Insert,
    /// In the catalog with an older stamp.
    Update,
    /// In the catalog and not older than the local file.
    Unchanged,
    /// Excluded before classification (content filter, no identifier,
    /// duplicate identifier, no stamp).
    Skip,
    /// In the catalog but absent locally.
    Delete,
}

impl Outcome {
    /// Classify a local record against the stamp the catalog holds for it.
    ///
    /// Stamps compare lexically, which orders ISO-8601 dates and date-times
    /// of the same form chronologically.
    pub fn classify(remote: Option<&str>, local: &str) -> Self {
        match remote {
            None => Outcome::Insert,
            Some(remote) if local > remote => Outcome::Update,
            Some(_) => Outcome::Unchanged,
        }
    }
}

/// Successful catalog mutations, as reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub replaced: u64,
    pub inserted: u64,
    pub deleted: u64,
    /// Records of the organisation in the catalog; starts at the remote
    /// index size.
    pub total_present: u64,
}

/// Outcomes as classified, whether or not the catalog call succeeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub insert: u64,
    pub update: u64,
    pub unchanged: u64,
    pub skip: u64,
    pub delete: u64,
}

impl Tally {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Insert => self.insert += 1,
            Outcome::Update => self.update += 1,
            Outcome::Unchanged => self.unchanged += 1,
            Outcome::Skip => self.skip += 1,
            Outcome::Delete => self.delete += 1,
        }
    }

    /// Number of records that needed a catalog mutation.
    pub fn actions(&self) -> u64 {
        self.insert + self.update + self.delete
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub counters: Counters,
    pub tally: Tally,
    /// Human-readable change and error lines, in processing order.
    pub log: Vec<String>,
}

impl RunSummary {
    pub fn starting_with(present: usize) -> Self {
        Self {
            counters: Counters {
                total_present: present as u64,
                ..Counters::default()
            },
            ..Self::default()
        }
    }

    pub fn note(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
    }

    pub fn has_changes(&self) -> bool {
        !self.log.is_empty()
    }
}
