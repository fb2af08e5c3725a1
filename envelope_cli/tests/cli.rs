//! CLI behavior: output formats, option flags and exit codes.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn sample_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("samples/detached_house_1960.json")
}

fn tables_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../envelope_core/data/reference_tables.toml")
}

fn cli() -> Command {
    Command::cargo_bin("envelope_cli").expect("binary exists")
}

fn run_json(args: &[&str]) -> serde_json::Value {
    let output = cli().arg(sample_path()).args(args).output().expect("run cli");
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).expect("json output")
}

#[test]
fn test_prints_result_json() {
    let result = run_json(&[]);
    assert!(result["total_w_per_k"].as_f64().unwrap() > 0.0);
    assert_eq!(result["reference_version"], "3cl-2021.4");
    assert_eq!(result["elements"].as_array().unwrap().len(), 12);
}

#[test]
fn test_attach_outputs_dwelling() {
    let output = run_json(&["--attach"]);
    assert!(output["dwelling"]["walls"][0]["intermediate"].is_object());
    assert!(output["result"]["subtotals"]["walls"].as_f64().unwrap() > 0.0);
}

#[test]
fn test_strict_references_changes_bridges() {
    let lenient = run_json(&[]);
    let strict = run_json(&["--strict-references"]);
    let lenient_bridges = lenient["subtotals"]["thermal_bridges"].as_f64().unwrap();
    let strict_bridges = strict["subtotals"]["thermal_bridges"].as_f64().unwrap();
    assert!(strict_bridges < lenient_bridges);
}

#[test]
fn test_explicit_tables_match_builtin() {
    let builtin = run_json(&[]);
    let tables = tables_path();
    let loaded = run_json(&["--tables", tables.to_str().unwrap()]);
    assert_eq!(builtin, loaded);
}

#[test]
fn test_summary() {
    cli()
        .arg(sample_path())
        .arg("--summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("ENVELOPE HEAT LOSS"))
        .stdout(predicate::str::contains("TOTAL:"));
}

#[test]
fn test_missing_file_fails() {
    cli()
        .arg("does-not-exist.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn test_attach_conflicts_with_summary() {
    cli().arg(sample_path()).args(["--attach", "--summary"]).assert().failure();
}
