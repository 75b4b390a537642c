// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reflow contributors

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn reflow() -> Command {
    let mut cmd = Command::cargo_bin("reflow").unwrap();
    cmd.env("NO_COLOR", "1").env_remove("REFLOW_SEED");
    cmd
}

#[test]
fn test_list_shows_builtins() {
    reflow()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("zip-flux"))
        .stdout(predicate::str::contains("retry-mono-fault"));
}

#[test]
fn test_run_zip_flux() {
    reflow()
        .args(["run", "zip-flux"])
        .assert()
        .success()
        .stdout("1-One\n2-Two\n3-Three\n4-Four\n");
}

#[test]
fn test_run_mono_error_prints_message() {
    reflow()
        .args(["run", "mono-error"])
        .assert()
        .success()
        .stdout("this is an error\n");
}

#[test]
fn test_run_json_report() {
    let output = reflow()
        .args(["run", "first-flux", "just", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(reports[0]["pipeline"], "first-flux");
    assert_eq!(reports[0]["delivered"], 4);
    assert_eq!(reports[0]["status"], "completed");
    assert_eq!(reports[1]["last"], "first-mono");
}

#[test]
fn test_run_seeded_is_reproducible() {
    let run = || {
        reflow()
            .args(["run", "retry-mono", "--seed", "11"])
            .output()
            .unwrap()
            .stdout
    };
    assert_eq!(run(), run());
}

#[test]
fn test_run_unknown_pipeline_fails() {
    reflow()
        .args(["run", "no-such-pipeline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown pipeline"));
}

#[test]
fn test_run_requires_a_name() {
    reflow()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No pipeline given"));
}

#[test]
fn test_run_pipeline_file() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("pipelines.yaml"),
        r#"
pipelines:
  - name: shout
    source: { type: items, items: [a, b] }
    stages:
      - { type: map, transform: uppercase }
      - { type: map, transform: suffix, value: "!" }
"#,
    )
    .unwrap();

    reflow()
        .current_dir(dir.path())
        .args(["run", "shout", "--pipeline", "pipelines.yaml"])
        .assert()
        .success()
        .stdout("A!\nB!\n");
}

#[test]
fn test_validate_builtins() {
    reflow()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pipelines are valid!"));
}

#[test]
fn test_validate_reports_errors() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.yaml");
    fs::write(
        &path,
        "pipelines:\n  - name: bad\n    source: { type: random, lower: 60, upper: 1 }\n",
    )
    .unwrap();

    reflow()
        .arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("reversed"));
}

#[test]
fn test_show_prints_yaml() {
    reflow()
        .args(["show", "retry-mono"])
        .assert()
        .success()
        .stdout(predicate::str::contains("type: random"))
        .stdout(predicate::str::contains("max_retries: 5"));
}

#[test]
fn test_disruptive_failures_report_only_the_fault() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("unlucky.yaml"),
        r#"
pipelines:
  - name: unlucky
    source: { type: random, lower: 1, upper: 10, failure: disruptive }
    stages:
      - { type: retry, max_retries: 2 }
"#,
    )
    .unwrap();

    reflow()
        .current_dir(dir.path())
        .args(["run", "unlucky", "--pipeline", "unlucky.yaml"])
        .assert()
        .success()
        .stdout("Retries exhausted after 3 attempts\n")
        .stderr(predicate::str::contains("panicked").not());
}

#[test]
fn test_run_overflowing_range_is_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("big.yaml"),
        "pipelines:\n  - name: big\n    source: { type: range, start: 9223372036854775806, count: 3 }\n",
    )
    .unwrap();

    reflow()
        .current_dir(dir.path())
        .args(["run", "big", "--pipeline", "big.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("overflows"))
        .stderr(predicate::str::contains("panicked").not());
}
