use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const PIPELINE: &str = r"
global @buf
global @out

define @produce() {
entry:
  store 1, @buf
  store 2, @out
  ret
}

define @consume() {
entry:
  store 3, @buf
  %v = load @buf
  ret
}

define @main(%n) {
entry:
  jump header
header:
  %i = phi [0, entry], [%i.next, header]
  %a = call @produce()
  %b = call @consume()
  %i.next = add %i, 1
  %more = icmp slt %i.next, %n
  branch %more, header, exit
exit:
  ret
}
";

fn write_fixture(dir: &TempDir, name: &str, source: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, source).unwrap();
    path
}

fn killflow() -> Command {
    let mut cmd = Command::cargo_bin("killflow").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_validate_accepts_well_formed_input() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "pipeline.kir", PIPELINE);

    killflow()
        .arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("VALID"));
}

#[test]
fn test_validate_reports_every_bad_file_in_a_directory() {
    let dir = TempDir::new().unwrap();
    write_fixture(&dir, "good.kir", PIPELINE);
    write_fixture(&dir, "bad.kir", "define @f( {");
    write_fixture(&dir, "notes.txt", "ignored");

    killflow()
        .arg("validate")
        .arg(dir.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("INVALID"))
        .stdout(predicate::str::contains("bad.kir"))
        .stdout(predicate::str::contains("notes.txt").not())
        .stderr(predicate::str::contains("validation failed for 1 file(s)"));
}

#[test]
fn test_dump_prints_ir_and_loops() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "pipeline.kir", PIPELINE);

    killflow()
        .arg("dump")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("define @main(%n) {"))
        .stdout(predicate::str::contains("%a = call @produce()"))
        .stdout(predicate::str::contains("=== @main ==="))
        .stdout(predicate::str::contains("header depth 1"));
}

#[test]
fn test_query_refines_overwritten_buffer() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "pipeline.kir", PIPELINE);

    killflow()
        .args(["query"])
        .arg(&path)
        .args(["--function", "main", "--loop", "header", "--src", "%a", "--dst", "%b"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lower:  ModRef"))
        .stdout(predicate::str::contains("result: Ref"));
}

#[test]
fn test_query_json_output() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "pipeline.kir", PIPELINE);
    let config = write_fixture(&dir, "config.json", r#"{ "timeout_secs": 0 }"#);

    let output = killflow()
        .args(["query"])
        .arg(&path)
        .args(["--function", "main", "--loop", "header", "--src", "a", "--dst", "b"])
        .arg("--config")
        .arg(&config)
        .args(["--timeout", "30", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["result"], "Ref");
    assert_eq!(json["relation"], "before");
    assert_eq!(json["src"], "main:%a");
    assert_eq!(json["combinator"]["eligible"], 1);
}

#[test]
fn test_query_unknown_loop_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "pipeline.kir", PIPELINE);

    killflow()
        .args(["query"])
        .arg(&path)
        .args(["--function", "main", "--loop", "entry", "--src", "a", "--dst", "b"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("entry"));
}

#[test]
fn test_flows_lists_every_pair() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "pipeline.kir", PIPELINE);

    let output = killflow()
        .arg("flows")
        .arg(&path)
        .args(["--function", "main", "--loop", "header", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["operations"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["verdicts"].as_array().map(Vec::len), Some(4));
}
