//! Reconciliation of the local metadata directory with the catalog.
//!
//! A run makes three sequential passes:
//!
//! 1. [`build_remote_index`] walks every search page and records
//!    identifier → stamp for the organisation's records.
//! 2. [`reconcile`] classifies each local document against that index and
//!    inserts or updates it in the catalog.
//! 3. Every remote identifier not seen among the local documents is deleted.
//!
//! Catalog failures are written to the change log and the pass continues;
//! nothing is retried. A search page that cannot be read leaves the index
//! incomplete, and an incomplete index never drives deletions.

use std::collections::HashSet;

use tracing::{debug, error, info, warn};

use crate::catalog::{
    self, Catalog, SearchPage, TOTAL_DELETED, TOTAL_INSERTED, TOTAL_UPDATED,
};
use crate::config::ContactInfo;
use crate::contact::rewrite_contacts;
use crate::error::PushError;
use crate::models::{MetadataDocument, Outcome, RemoteIndex, RunSummary};
use crate::progress::{PushProgressEvent, PushProgressReporter};

/// Settings for one reconciliation pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct PushOptions<'a> {
    /// Classify only; issue no insert, update or delete calls.
    pub dry_run: bool,
    /// Contact written over every responsible party of outgoing records.
    pub contact: Option<&'a ContactInfo>,
    /// Case-insensitive substrings a document must contain one of.
    pub content_filter: &'a [String],
}

/// Remote index together with the search pages that could not be read.
#[derive(Debug, Clone, Default)]
pub struct RemoteScan {
    pub index: RemoteIndex,
    /// One change-log line per failed search page.
    pub failed_pages: Vec<String>,
}

impl RemoteScan {
    /// `true` when every search page was read.
    pub fn is_complete(&self) -> bool {
        self.failed_pages.is_empty()
    }
}

/// Fetch every page of the organisation's records into a [`RemoteScan`].
///
/// A failed page is recorded and skipped using the size of the last page
/// read. When no page has been read yet, paging stops at the failure.
pub fn build_remote_index<C: Catalog + ?Sized>(
    catalog: &C,
    organisation: &str,
    progress: &dyn PushProgressReporter,
) -> RemoteScan {
    let mut scan = RemoteScan::default();
    let mut start = 1;
    let mut page_no = 0;
    let mut last_read: Option<SearchPage> = None;

    loop {
        page_no += 1;
        let page = match fetch_page(catalog, organisation, start) {
            Ok((response, page)) => {
                let merged = scan.index.merge_page(&response);
                debug!(
                    "search page {} (start {}): {} of {} returned, {} merged",
                    page_no, start, page.returned, page.matched, merged
                );
                last_read = Some(page);
                page
            }
            Err(detail) => {
                error!("search page {} (start {}) failed: {}", page_no, start, detail);
                scan.failed_pages.push(format!(
                    "Could not read the catalog records from position {}: {}",
                    start, detail
                ));
                match last_read {
                    Some(prev) => SearchPage {
                        next_record: None,
                        ..prev
                    },
                    None => break,
                }
            }
        };
        progress.report(PushProgressEvent::Indexing {
            page: page_no,
            records: scan.index.len() as u64,
        });

        match page.next_start(start) {
            Some(next) => start = next,
            None => break,
        }
    }

    info!(
        "catalog holds {} records for '{}'{}",
        scan.index.len(),
        organisation,
        if scan.is_complete() { "" } else { " (index incomplete)" }
    );
    scan
}

fn fetch_page<C: Catalog + ?Sized>(
    catalog: &C,
    organisation: &str,
    start: u32,
) -> Result<(String, SearchPage), String> {
    let response = catalog
        .search(organisation, start)
        .map_err(|e| e.to_string())?;
    match catalog::parse_search_results(&response) {
        Some(page) => Ok((response, page)),
        None => Err(format!(
            "no search results in the response ({})",
            catalog::exception_text(&response).unwrap_or("unrecognized response")
        )),
    }
}

/// `true` when `filter` is empty or `text` contains one of its entries,
/// ignoring case.
pub fn passes_filter(text: &str, filter: &[String]) -> bool {
    if filter.is_empty() {
        return true;
    }
    let text = text.to_lowercase();
    filter
        .iter()
        .any(|needle| text.contains(&needle.to_lowercase()))
}

/// Push `documents` to the catalog and delete the records they no longer
/// cover.
pub fn reconcile<C: Catalog + ?Sized>(
    catalog: &C,
    remote: &RemoteScan,
    documents: &[MetadataDocument],
    options: &PushOptions<'_>,
    progress: &dyn PushProgressReporter,
) -> RunSummary {
    let mut summary = RunSummary::starting_with(remote.index.len());
    for line in &remote.failed_pages {
        summary.note(line.clone());
    }
    let mut seen: HashSet<String> = HashSet::new();

    let total = documents.len() as u64;
    for (i, doc) in documents.iter().enumerate() {
        progress.report(PushProgressEvent::Reconciling {
            n: i as u64 + 1,
            total,
        });
        let outcome = push_document(catalog, &remote.index, doc, options, &mut seen, &mut summary);
        summary.tally.record(outcome);
    }

    if !remote.is_complete() {
        warn!("catalog index incomplete, no records deleted");
        summary.note(
            "Records missing locally were not deleted because the catalog index is incomplete",
        );
        return summary;
    }

    let leftovers: Vec<&str> = remote
        .index
        .iter()
        .map(|(identifier, _)| identifier)
        .filter(|identifier| !seen.contains(*identifier))
        .collect();
    let total = leftovers.len() as u64;
    for (i, identifier) in leftovers.into_iter().enumerate() {
        progress.report(PushProgressEvent::Deleting {
            n: i as u64 + 1,
            total,
        });
        summary.tally.record(Outcome::Delete);
        if options.dry_run {
            info!("would delete record {}", identifier);
            continue;
        }
        delete_record(catalog, identifier, &mut summary);
    }

    summary
}

fn push_document<C: Catalog + ?Sized>(
    catalog: &C,
    remote: &RemoteIndex,
    doc: &MetadataDocument,
    options: &PushOptions<'_>,
    seen: &mut HashSet<String>,
    summary: &mut RunSummary,
) -> Outcome {
    if !passes_filter(&doc.text, options.content_filter) {
        debug!("{} does not match the content filter", doc.name);
        return Outcome::Skip;
    }

    let Some(identifier) = doc.identifier() else {
        warn!("{} has no fileIdentifier, skipped", doc.name);
        summary.note(format!("File {} has no fileIdentifier and was skipped", doc.name));
        return Outcome::Skip;
    };

    if !seen.insert(identifier.to_string()) {
        warn!("{} repeats identifier {}, skipped", doc.name, identifier);
        summary.note(format!(
            "File {} repeats identifier {} of an earlier file and was skipped",
            doc.name, identifier
        ));
        return Outcome::Skip;
    }

    // Marked as seen above, so the catalog copy is kept.
    let Some(modified_at) = doc.modified_at() else {
        warn!("{} has no dateStamp, skipped", doc.name);
        summary.note(format!("File {} has no dateStamp and was skipped", doc.name));
        return Outcome::Skip;
    };

    let outcome = Outcome::classify(remote.get(identifier), modified_at);
    match outcome {
        Outcome::Insert | Outcome::Update if options.dry_run => {
            info!("would {:?} {} ({})", outcome, doc.name, identifier);
        }
        Outcome::Insert => insert_document(catalog, doc, options.contact, summary),
        Outcome::Update => update_document(catalog, doc, identifier, options.contact, summary),
        Outcome::Unchanged | Outcome::Skip | Outcome::Delete => {
            debug!("{} is up to date", doc.name);
        }
    }
    outcome
}

fn outgoing_text(doc: &MetadataDocument, contact: Option<&ContactInfo>) -> String {
    match contact {
        Some(contact) => rewrite_contacts(&doc.text, contact),
        None => doc.text.clone(),
    }
}

fn insert_document<C: Catalog + ?Sized>(
    catalog: &C,
    doc: &MetadataDocument,
    contact: Option<&ContactInfo>,
    summary: &mut RunSummary,
) {
    let text = outgoing_text(doc, contact);
    let result = catalog
        .insert(&text)
        .and_then(|response| catalog::expect_single(&response, TOTAL_INSERTED));
    match result {
        Ok(()) => {
            info!("{} inserted into the catalog", doc.name);
            summary.note(format!("File {} was inserted into the catalog", doc.name));
            summary.counters.inserted += 1;
            summary.counters.total_present += 1;
        }
        Err(err) => record_failure(summary, "inserting", &format!("file {}", doc.name), &err),
    }
}

fn update_document<C: Catalog + ?Sized>(
    catalog: &C,
    doc: &MetadataDocument,
    identifier: &str,
    contact: Option<&ContactInfo>,
    summary: &mut RunSummary,
) {
    let text = outgoing_text(doc, contact);
    let result = catalog
        .update(&text, identifier)
        .and_then(|response| catalog::expect_single(&response, TOTAL_UPDATED));
    match result {
        Ok(()) => {
            info!("{} replaced in the catalog", doc.name);
            summary.note(format!("File {} was replaced in the catalog", doc.name));
            summary.counters.replaced += 1;
        }
        Err(err) => record_failure(summary, "replacing", &format!("file {}", doc.name), &err),
    }
}

fn delete_record<C: Catalog + ?Sized>(catalog: &C, identifier: &str, summary: &mut RunSummary) {
    let result = catalog
        .delete(identifier)
        .and_then(|response| catalog::expect_single(&response, TOTAL_DELETED));
    match result {
        Ok(()) => {
            info!("record {} deleted from the catalog", identifier);
            summary.note(format!(
                "Record with identifier {} was deleted from the catalog",
                identifier
            ));
            summary.counters.deleted += 1;
            summary.counters.total_present = summary.counters.total_present.saturating_sub(1);
        }
        Err(err) => record_failure(
            summary,
            "deleting",
            &format!("record with identifier {}", identifier),
            &err,
        ),
    }
}

fn record_failure(summary: &mut RunSummary, action: &str, subject: &str, err: &PushError) {
    let line = match err {
        PushError::NoEffect(detail) => {
            warn!("{} {}: no effect ({})", action, subject, detail);
            format!(
                "While {} {} the catalog reported no change: {}",
                action, subject, detail
            )
        }
        other => {
            error!("{} {} failed: {}", action, subject, other);
            format!("While {} {} an error occurred: {}", action, subject, other)
        }
    };
    summary.note(line);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_passes_everything() {
        assert!(passes_filter("<MD_Metadata/>", &[]));
    }

    #[test]
    fn filter_ignores_case() {
        let filter = vec!["Brabant".to_string(), "zeeland".to_string()];
        assert!(passes_filter("<x>Provincie NOORD-BRABANT</x>", &filter));
        assert!(passes_filter("<x>ZEELAND</x>", &filter));
        assert!(!passes_filter("<x>Limburg</x>", &filter));
    }
}
