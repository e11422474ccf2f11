//! TOML configuration.
//!
//! Every table rejects unknown keys, so a typo in the file is reported
//! instead of silently falling back to a default.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::PushError;

/// Environment variable consulted when `catalog.password` is not in the file.
pub const PASSWORD_ENV: &str = "MDPUSH_CATALOG_PASSWORD";

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Organisation name the catalog filters records on (`orgName`).
    pub organisation: String,
    /// Case-insensitive substrings; when non-empty, a file must contain at
    /// least one of them to be pushed.
    #[serde(default)]
    pub content_filter: Vec<String>,
    pub dirs: DirsConfig,
    #[serde(default)]
    pub files: FilesConfig,
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub contact: Option<ContactInfo>,
    #[serde(default)]
    pub report: Option<ReportConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DirsConfig {
    /// Directory holding the authoritative metadata files.
    pub metadata: PathBuf,
    /// Directory for the run log and the report outbox.
    pub log: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct FilesConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec!["*.xml".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// Base URL of the catalog, e.g. `https://catalog.example.org`.
    pub url: String,
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_search_path")]
    pub search_path: String,
    #[serde(default = "default_publication_path")]
    pub publication_path: String,
}

fn default_verify_tls() -> bool {
    true
}
fn default_page_size() -> u32 {
    50
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_search_path() -> String {
    "/geonetwork/srv/eng/csw".to_string()
}
fn default_publication_path() -> String {
    "/geonetwork/srv/eng/csw-publication?publishToAll=true".to_string()
}

impl CatalogConfig {
    pub fn search_url(&self) -> String {
        join_url(&self.url, &self.search_path)
    }

    pub fn publication_url(&self) -> String {
        join_url(&self.url, &self.publication_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Normalized organisation contact written over every responsible party.
///
/// Each field is optional; a missing field means the matching element is
/// left out of the rewritten block.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ContactInfo {
    pub organisation: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub email: Option<String>,
    pub url: Option<String>,
}

impl ContactInfo {
    pub fn organisation(name: &str) -> Self {
        Self {
            organisation: Some(name.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    pub sender: String,
    #[serde(default)]
    pub alias: Option<String>,
    pub recipients: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
    #[serde(default)]
    pub footer: FooterConfig,
}

/// Signature lines appended below the counters in the report.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct FooterConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub organisation: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub website: String,
}

impl Config {
    pub fn log_file(&self) -> PathBuf {
        self.dirs.log.join("mdpush.log")
    }

    pub fn outbox_file(&self) -> PathBuf {
        self.dirs.log.join("mdpush-reports.txt")
    }

    /// Catalog password from the file, or from [`PASSWORD_ENV`].
    pub fn catalog_password(&self) -> Result<String, PushError> {
        if let Some(ref password) = self.catalog.password {
            return Ok(password.clone());
        }
        std::env::var(PASSWORD_ENV).map_err(|_| {
            PushError::ConfigMissing(format!(
                "catalog.password is not set and {} is not in the environment",
                PASSWORD_ENV
            ))
        })
    }
}

pub fn load_config(path: &Path) -> Result<Config, PushError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        PushError::ConfigMissing(format!(
            "failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config, PushError> {
    let config: Config = toml::from_str(content)
        .map_err(|e| PushError::ConfigMissing(format!("failed to parse config file: {}", e)))?;

    if config.organisation.trim().is_empty() {
        return Err(PushError::ConfigMissing(
            "organisation must not be empty".to_string(),
        ));
    }

    let url = config.catalog.url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(PushError::ConfigMissing(format!(
            "catalog.url must be an http(s) URL, got '{}'",
            config.catalog.url
        )));
    }

    if config.catalog.page_size == 0 {
        return Err(PushError::ConfigMissing(
            "catalog.page_size must be >= 1".to_string(),
        ));
    }

    if config.files.include_globs.is_empty() {
        return Err(PushError::ConfigMissing(
            "files.include_globs must list at least one pattern".to_string(),
        ));
    }

    if let Some(ref report) = config.report {
        if report.recipients.is_empty() {
            return Err(PushError::ConfigMissing(
                "report.recipients must not be empty".to_string(),
            ));
        }
    }

    Ok(config)
}
