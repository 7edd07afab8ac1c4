//! End-to-end tests for the `ql-query` binary.
#![expect(clippy::expect_used, reason = "tests fail fast on setup errors")]

use std::io::Write;
use std::str;

use assert_cmd::Command;
use rstest::{fixture, rstest};
use tempfile::NamedTempFile;

const LIBRARY: &str = concat!(
    r#"{"artist": "Nina Simone", "album": "Pastel Blues", "title": "Sinnerman", "genre": "Jazz", "~#rating": 0.8}"#,
    "\n",
    r#"{"artist": "Björk", "album": "Homogenic", "title": "Jóga", "genre": "Electronic", "~#rating": 0.6}"#,
    "\n",
    r#"{"artist": "Foo Fighters", "album": "The Colour and the Shape", "title": "Everlong", "~#rating": 0.4}"#,
    "\n",
);

fn binary() -> Command {
    let mut cmd = Command::cargo_bin("ql-query").expect("binary exists");
    cmd.env_remove("QL_QUERY_LOG_LEVEL")
        .env_remove("QL_QUERY_STAR")
        .env_remove("QL_QUERY_DIACRITICS")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_of(output: &std::process::Output) -> &str {
    str::from_utf8(&output.stdout).expect("utf8")
}

#[fixture]
fn library_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(LIBRARY.as_bytes()).expect("write library");
    file
}

#[rstest]
#[case("#(rating > 0.5)", &["Sinnerman", "Jóga"])]
#[case("artist=!björk", &["Sinnerman", "Everlong"])]
#[case("jazz", &[])]
#[case("joga", &["Jóga"])]
#[case("|(genre=jazz, title=/^ever/)", &["Sinnerman", "Everlong"])]
fn filter_reads_records_from_a_file(
    library_file: NamedTempFile,
    #[case] query: &str,
    #[case] titles: &[&str],
) {
    let output = binary()
        .arg("filter")
        .arg(query)
        .arg("--input")
        .arg(library_file.path())
        .output()
        .expect("runs");
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert_eq!(stdout.lines().count(), titles.len(), "{stdout}");
    for title in titles {
        assert!(stdout.contains(title), "{title} missing from {stdout}");
    }
}

#[test]
fn filter_reads_records_from_stdin() {
    let output = binary()
        .args(["filter", "fighters"])
        .write_stdin(LIBRARY)
        .output()
        .expect("runs");
    assert!(output.status.success());
    assert_eq!(stdout_of(&output).lines().collect::<Vec<_>>().len(), 1);
    assert!(stdout_of(&output).contains("Everlong"));
}

#[test]
fn star_from_the_environment_changes_free_text_search() {
    let output = binary()
        .env("QL_QUERY_STAR", "genre")
        .args(["filter", "jazz"])
        .write_stdin(LIBRARY)
        .output()
        .expect("runs");
    assert!(output.status.success());
    assert!(stdout_of(&output).contains("Sinnerman"));
}

#[test]
fn star_flag_overrides_the_environment() {
    let output = binary()
        .env("QL_QUERY_STAR", "genre")
        .args(["--star", "album", "filter", "homogenic"])
        .write_stdin(LIBRARY)
        .output()
        .expect("runs");
    assert!(output.status.success());
    assert!(stdout_of(&output).contains("Jóga"));
}

#[test]
fn classify_prints_each_interpretation() {
    let output = binary()
        .args(["classify", "artist=nina", "nina simone", "#(1 < 2)"])
        .output()
        .expect("runs");
    assert!(output.status.success());
    assert_eq!(
        stdout_of(&output),
        "valid\tartist=nina\ntext\tnina simone\ninvalid\t#(1 < 2)\n"
    );
}

#[test]
fn invalid_query_fails() {
    let output = binary()
        .args(["filter", "#(rating >)"])
        .write_stdin(LIBRARY)
        .output()
        .expect("runs");
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = str::from_utf8(&output.stderr).expect("utf8");
    assert!(stderr.contains("invalid query"), "{stderr}");
}

#[test]
fn malformed_record_fails() {
    let output = binary()
        .args(["filter", "nina"])
        .write_stdin("{\"artist\": \"Nina\"}\n[1, 2]\n")
        .output()
        .expect("runs");
    assert!(!output.status.success());
    let stderr = str::from_utf8(&output.stderr).expect("utf8");
    assert!(stderr.contains("line 2"), "{stderr}");
}

#[rstest]
#[case("QL_QUERY_LOG_LEVEL", "chatty")]
#[case("QL_QUERY_DIACRITICS", "sometimes")]
fn invalid_environment_exits_with_code_two(#[case] key: &str, #[case] value: &str) {
    binary()
        .env(key, value)
        .args(["classify", "x"])
        .assert()
        .code(2);
}

#[test]
fn check_diacritics_reports_table_state() {
    let output = binary()
        .arg("check-diacritics")
        .output()
        .expect("runs");
    let stdout = stdout_of(&output);
    if output.status.success() {
        assert_eq!(stdout, "diacritic table is current\n");
    } else {
        assert!(stdout.ends_with("diacritic table is stale\n"), "{stdout}");
    }
}
