use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn mdpush_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("mdpush");
    path
}

const RECORD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gmd:MD_Metadata xmlns:gmd="http://www.isotc211.org/2005/gmd" xmlns:gco="http://www.isotc211.org/2005/gco">
<gmd:fileIdentifier><gco:CharacterString>4f1c6f7e-0001</gco:CharacterString></gmd:fileIdentifier>
<gmd:dateStamp><gco:Date>2019-12-03</gco:Date></gmd:dateStamp>
<gmd:identificationInfo><gmd:MD_DataIdentification>
<gmd:pointOfContact><gmd:CI_ResponsibleParty>
<gmd:organisationName><gco:CharacterString>Team Geo</gco:CharacterString></gmd:organisationName>
<gmd:role><gmd:CI_RoleCode codeList="x#CI_RoleCode" codeListValue="custodian">custodian</gmd:CI_RoleCode></gmd:role>
</gmd:CI_ResponsibleParty></gmd:pointOfContact>
</gmd:MD_DataIdentification></gmd:identificationInfo>
</gmd:MD_Metadata>
"#;

fn setup_test_env(extra: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let metadata_dir = root.join("metadata");
    fs::create_dir_all(&metadata_dir).unwrap();
    fs::write(metadata_dir.join("wegen.xml"), RECORD).unwrap();
    fs::write(
        metadata_dir.join("concept.xml"),
        "<gmd:MD_Metadata><gmd:dateStamp><gco:Date>2020-01-01</gco:Date></gmd:dateStamp></gmd:MD_Metadata>",
    )
    .unwrap();
    fs::write(metadata_dir.join("readme.txt"), "not a record").unwrap();

    // Port 1 on loopback refuses connections.
    let config_content = format!(
        r#"organisation = "Provincie Noord-Brabant"

[dirs]
metadata = "{root}/metadata"
log = "{root}/log"

[catalog]
url = "http://127.0.0.1:1"
user = "admin"
password = "secret"
timeout_secs = 5
{extra}"#,
        root = root.display(),
        extra = extra
    );

    let config_path = config_dir.join("mdpush.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_mdpush(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = mdpush_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run mdpush binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_check_lists_local_records() {
    let (_tmp, config_path) = setup_test_env("");

    let (stdout, stderr, success) = run_mdpush(&config_path, &["check"]);
    assert!(success, "check failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("4f1c6f7e-0001"));
    assert!(stdout.contains("files: 2"));
    assert!(stdout.contains("with identifier: 1"));
    assert!(stdout.contains("contact rewrite: off"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_check_creates_log_file() {
    let (tmp, config_path) = setup_test_env("");

    let (_, _, success) = run_mdpush(&config_path, &["check"]);
    assert!(success);
    assert!(tmp.path().join("log/mdpush.log").exists());
}

#[test]
fn test_unknown_config_key_fails() {
    let (_tmp, config_path) = setup_test_env("verifyRequest = false\n");

    let (_, stderr, success) = run_mdpush(&config_path, &["check"]);
    assert!(!success);
    assert!(stderr.contains("unknown field"), "stderr={}", stderr);
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_mdpush(&tmp.path().join("absent.toml"), &["check"]);
    assert!(!success);
    assert!(stderr.contains("failed to read config file"));
}

#[test]
fn test_rewrite_prints_normalized_contacts() {
    let (tmp, config_path) = setup_test_env(
        "\n[contact]\norganisation = \"Provincie Noord-Brabant\"\nemail = \"geo@brabant.nl\"\n",
    );

    let file = tmp.path().join("metadata/wegen.xml");
    let (stdout, stderr, success) =
        run_mdpush(&config_path, &["rewrite", file.to_str().unwrap()]);
    assert!(success, "rewrite failed: stderr={}", stderr);
    assert!(stdout.starts_with("<gmd:MD_Metadata"));
    assert!(stdout.contains(r#"codeListValue="owner""#));
    assert!(stdout.contains("geo@brabant.nl"));
    assert!(!stdout.contains("Team Geo"));
}

#[test]
fn test_rewrite_needs_contact_section() {
    let (tmp, config_path) = setup_test_env("");

    let file = tmp.path().join("metadata/wegen.xml");
    let (_, stderr, success) = run_mdpush(&config_path, &["rewrite", file.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("[contact]"));
}

#[test]
fn test_push_without_catalog_reports_and_deletes_nothing() {
    let (tmp, config_path) = setup_test_env(
        "\n[report]\nsender = \"a@example.org\"\nrecipients = [\"b@example.org\"]\n",
    );

    let (stdout, stderr, success) = run_mdpush(&config_path, &["push", "--progress", "off"]);
    assert!(success, "push failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("records inserted: 0"));
    assert!(stdout.contains("records deleted: 0"));
    assert!(stdout.contains("ok"));

    let outbox = fs::read_to_string(tmp.path().join("log/mdpush-reports.txt")).unwrap();
    assert!(outbox.contains("To: b@example.org"));
    assert!(outbox.contains("Could not read the catalog records from position 1"));
    assert!(outbox.contains("While inserting file wegen.xml an error occurred"));
    assert!(outbox.contains("were not deleted because the catalog index is incomplete"));
}

#[test]
fn test_index_without_catalog_fails() {
    let (_tmp, config_path) = setup_test_env("");

    let (stdout, stderr, success) = run_mdpush(&config_path, &["index"]);
    assert!(!success, "index should fail: stdout={}", stdout);
    assert!(stderr.contains("Could not read the catalog records from position 1"));
    assert!(stderr.contains("1 search pages could not be read"));
}
