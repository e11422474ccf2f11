//! Read-only commands: `check`, `index` and `rewrite`.

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::catalog::CswClient;
use crate::config::Config;
use crate::connector_fs::{read_document, scan_metadata_dir};
use crate::contact::rewrite_contacts;
use crate::error::PushError;
use crate::progress::NoProgress;
use crate::reconcile::{build_remote_index, passes_filter};

/// Validate the local side of a run without touching the catalog.
pub fn run_check(config: &Config) -> Result<()> {
    let documents = scan_metadata_dir(config)?;

    println!("{:<40} {:<40} DATESTAMP", "FILE", "IDENTIFIER");
    let mut with_identifier = 0;
    let mut filtered = 0;
    for doc in &documents {
        if !passes_filter(&doc.text, &config.content_filter) {
            filtered += 1;
        }
        let identifier = doc.identifier();
        if identifier.is_some() {
            with_identifier += 1;
        }
        println!(
            "{:<40} {:<40} {}",
            doc.name,
            identifier.unwrap_or("-"),
            doc.modified_at().unwrap_or("-")
        );
    }

    println!();
    println!("organisation: {}", config.organisation);
    println!("catalog: {}", config.catalog.search_url());
    println!("files: {}", documents.len());
    println!("with identifier: {}", with_identifier);
    if !config.content_filter.is_empty() {
        println!("outside content filter: {}", filtered);
    }
    println!(
        "contact rewrite: {}",
        if config.contact.is_some() { "on" } else { "off" }
    );
    if let Err(e) = config.catalog_password() {
        println!("warning: {}", e);
    }
    println!("ok");
    Ok(())
}

/// Print the catalog's records for the organisation, one per line.
pub fn run_index(config: &Config) -> Result<()> {
    let client = CswClient::from_config(config)?;
    let scan = build_remote_index(&client, &config.organisation, &NoProgress);
    for (identifier, modified_at) in scan.index.iter() {
        println!("{}  {}", identifier, modified_at);
    }
    eprintln!("{} records", scan.index.len());
    for line in &scan.failed_pages {
        eprintln!("{}", line);
    }
    if !scan.is_complete() {
        bail!("{} search pages could not be read", scan.failed_pages.len());
    }
    Ok(())
}

/// Print `path` as it would be sent to the catalog.
pub fn run_rewrite(config: &Config, path: &Path) -> Result<()> {
    let contact = config.contact.as_ref().ok_or_else(|| {
        PushError::ConfigMissing("rewrite needs a [contact] section".to_string())
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("not a file: {}", path.display()))?;
    let doc = read_document(path, &name)?;
    print!("{}", rewrite_contacts(&doc.text, contact));
    Ok(())
}
