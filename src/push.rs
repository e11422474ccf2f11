//! The `push` command: one full reconciliation run.
//!
//! Scans the metadata directory, builds the remote index, reconciles, and
//! hands the change report to the outbox. Prints the counters to stdout.

use anyhow::Result;
use tracing::info;

use crate::catalog::CswClient;
use crate::config::Config;
use crate::connector_fs::scan_metadata_dir;
use crate::models::RunSummary;
use crate::progress::ProgressMode;
use crate::reconcile::{build_remote_index, reconcile, PushOptions};
use crate::report::{build_report, counter_lines, OutboxSink, ReportSink};

pub fn run_push(config: &Config, dry_run: bool, progress: ProgressMode) -> Result<RunSummary> {
    let documents = scan_metadata_dir(config)?;
    let client = CswClient::from_config(config)?;
    let reporter = progress.reporter();

    info!(
        "pushing {} local files for '{}'{}",
        documents.len(),
        config.organisation,
        if dry_run { " (dry-run)" } else { "" }
    );
    let remote = build_remote_index(&client, &config.organisation, reporter.as_ref());

    let options = PushOptions {
        dry_run,
        contact: config.contact.as_ref(),
        content_filter: &config.content_filter,
    };
    let summary = reconcile(&client, &remote, &documents, &options, reporter.as_ref());

    print_summary(config, &summary, dry_run);

    if !dry_run {
        deliver_report(config, &summary)?;
    }
    Ok(summary)
}

fn print_summary(config: &Config, summary: &RunSummary, dry_run: bool) {
    let tally = &summary.tally;
    if dry_run {
        println!("push {} (dry-run)", config.organisation);
        println!("  would insert: {}", tally.insert);
        println!("  would update: {}", tally.update);
        println!("  would delete: {}", tally.delete);
        println!("  unchanged: {}", tally.unchanged);
        println!("  skipped: {}", tally.skip);
        return;
    }

    println!("push {}", config.organisation);
    for line in counter_lines(summary).lines() {
        println!("  {}", line);
    }
    println!("  unchanged: {}", tally.unchanged);
    println!("  skipped: {}", tally.skip);
    println!("ok");
}

fn deliver_report(config: &Config, summary: &RunSummary) -> Result<()> {
    let Some(ref report_config) = config.report else {
        return Ok(());
    };
    match build_report(&config.organisation, summary, report_config) {
        Some(report) => {
            let sink = OutboxSink::new(config.outbox_file());
            sink.deliver(&report)?;
            info!(
                "report for {} recipients written to {}",
                report.to.len(),
                config.outbox_file().display()
            );
        }
        None => info!("nothing changed, no report"),
    }
    Ok(())
}
