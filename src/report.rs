//! Change report for the catalog administrators.
//!
//! After a run the change log and the counters are rendered into a plain
//! text message. Nothing is produced when the run changed nothing and hit
//! no errors. The message goes to a [`ReportSink`]; the shipped
//! [`OutboxSink`] appends it to a file in the log directory.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::config::{FooterConfig, ReportConfig};
use crate::models::RunSummary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl Report {
    /// Message with RFC 5322 style headers.
    pub fn to_message(&self, date: DateTime<Local>) -> String {
        let mut out = String::new();
        out.push_str(&format!("Date: {}\n", date.to_rfc2822()));
        out.push_str(&format!("From: {}\n", self.from));
        out.push_str(&format!("To: {}\n", self.to.join(", ")));
        if !self.cc.is_empty() {
            out.push_str(&format!("Cc: {}\n", self.cc.join(", ")));
        }
        if !self.bcc.is_empty() {
            out.push_str(&format!("Bcc: {}\n", self.bcc.join(", ")));
        }
        out.push_str(&format!("Subject: {}\n\n", self.subject));
        out.push_str(&self.body);
        out.push('\n');
        out
    }
}

/// Build the report for a finished run; `None` when there is nothing to say.
pub fn build_report(organisation: &str, summary: &RunSummary, config: &ReportConfig) -> Option<Report> {
    if !summary.has_changes() {
        return None;
    }
    Some(Report {
        from: config.alias.clone().unwrap_or_else(|| config.sender.clone()),
        to: config.recipients.clone(),
        cc: config.cc.clone(),
        bcc: config.bcc.clone(),
        subject: format!("Metadata push for {} completed", organisation),
        body: render_body(organisation, summary, &config.footer),
    })
}

pub fn render_body(organisation: &str, summary: &RunSummary, footer: &FooterConfig) -> String {
    let mut body = String::from("Dear administrator,\n\n\n");
    body.push_str(&format!(
        "Pushing the metadata of {} made the following changes:\n\n",
        organisation
    ));
    for line in &summary.log {
        body.push_str(line);
        body.push('\n');
    }
    body.push_str("\n\n");
    body.push_str(&counter_lines(summary));
    body.push_str("\n\n");

    let place = [footer.postal_code.as_str(), footer.city.as_str()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("  ");
    for line in [
        footer.name.as_str(),
        footer.organisation.as_str(),
        footer.email.as_str(),
        footer.address.as_str(),
        place.as_str(),
    ] {
        if !line.is_empty() {
            body.push_str(line);
            body.push('\n');
        }
    }
    if !footer.website.is_empty() {
        body.push('\n');
        body.push_str(&footer.website);
    }
    body.trim_end().to_string()
}

/// The four counter lines, shared by the report and the CLI output.
pub fn counter_lines(summary: &RunSummary) -> String {
    let c = &summary.counters;
    format!(
        "records replaced: {}\nrecords inserted: {}\nrecords deleted: {}\nrecords present: {}\n",
        c.replaced, c.inserted, c.deleted, c.total_present
    )
}

/// Destination for finished reports.
pub trait ReportSink {
    fn deliver(&self, report: &Report) -> Result<()>;
}

/// Appends each report to a text file, separated by a rule.
pub struct OutboxSink {
    path: PathBuf,
}

impl OutboxSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for OutboxSink {
    fn deliver(&self, report: &Report) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open outbox {}", self.path.display()))?;
        writeln!(file, "{}", report.to_message(Local::now()))?;
        writeln!(file, "{}", "-".repeat(72))?;
        Ok(())
    }
}
