//! Local metadata directory.
//!
//! Walks `dirs.metadata`, keeps the files matching `files.include_globs`
//! (and none of `files.exclude_globs`), and reads each one as a
//! [`MetadataDocument`]. Patterns are matched against the path relative to
//! the directory; `*` does not cross `/`, so the default `*.xml` only picks
//! files at the top level.

use anyhow::{bail, Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::Config;
use crate::models::MetadataDocument;

/// Name of the root element every record starts with.
pub const ROOT_MARKER: &str = "MD_Metadata";

pub fn scan_metadata_dir(config: &Config) -> Result<Vec<MetadataDocument>> {
    let root = &config.dirs.metadata;
    if !root.is_dir() {
        bail!("metadata directory does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.files.include_globs)?;
    let exclude_set = build_globset(&config.files.exclude_globs)?;

    let mut documents = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        documents.push(read_document(path, &rel_str)?);
    }

    debug!(
        "found {} metadata files in {}",
        documents.len(),
        root.display()
    );
    Ok(documents)
}

/// Read one file; invalid UTF-8 sequences are replaced rather than rejected.
pub fn read_document(path: &Path, name: &str) -> Result<MetadataDocument> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(MetadataDocument::new(name, path, trim_to_root(&text)))
}

/// Drop everything before the root element (XML declaration, comments,
/// byte-order mark). Text without a root element is returned as is.
pub fn trim_to_root(text: &str) -> &str {
    match text
        .find(ROOT_MARKER)
        .and_then(|pos| text[..pos].rfind('<'))
    {
        Some(start) => &text[start..],
        None => text,
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern '{}'", pattern))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use std::fs;
    use tempfile::TempDir;

    fn config_for(dir: &Path, extra: &str) -> Config {
        parse_config(&format!(
            r#"
organisation = "X"

[dirs]
metadata = "{}"
log = "{}"

[catalog]
url = "http://localhost:8080"
user = "u"
password = "p"
{}
"#,
            dir.display(),
            dir.display(),
            extra
        ))
        .unwrap()
    }

    #[test]
    fn trims_declaration_and_prefix() {
        let text = "\u{feff}<?xml version=\"1.0\"?>\n<!-- export -->\n<gmd:MD_Metadata>x</gmd:MD_Metadata>";
        assert_eq!(trim_to_root(text), "<gmd:MD_Metadata>x</gmd:MD_Metadata>");
        assert_eq!(trim_to_root("<root/>"), "<root/>");
    }

    #[test]
    fn default_globs_take_top_level_xml_only() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.xml"), "<?xml?><MD_Metadata>b</MD_Metadata>").unwrap();
        fs::write(tmp.path().join("a.xml"), "<MD_Metadata>a</MD_Metadata>").unwrap();
        fs::write(tmp.path().join("notes.txt"), "not metadata").unwrap();
        fs::create_dir_all(tmp.path().join("archive")).unwrap();
        fs::write(tmp.path().join("archive/c.xml"), "<MD_Metadata/>").unwrap();

        let docs = scan_metadata_dir(&config_for(tmp.path(), "")).unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.xml", "b.xml"]);
        assert_eq!(docs[1].text, "<MD_Metadata>b</MD_Metadata>");
    }

    #[test]
    fn recursive_globs_and_excludes() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("archive")).unwrap();
        fs::create_dir_all(tmp.path().join("current")).unwrap();
        fs::write(tmp.path().join("archive/old.xml"), "<MD_Metadata/>").unwrap();
        fs::write(tmp.path().join("current/new.xml"), "<MD_Metadata/>").unwrap();

        let config = config_for(
            tmp.path(),
            "\n[files]\ninclude_globs = [\"**/*.xml\"]\nexclude_globs = [\"archive/**\"]\n",
        );
        let docs = scan_metadata_dir(&config).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "current/new.xml");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let config = config_for(&tmp.path().join("nope"), "");
        assert!(scan_metadata_dir(&config).is_err());
    }
}
