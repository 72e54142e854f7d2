//! End-to-end tests for the `list` command

mod common;

use common::{file_url, head_commit, init_git_repo, TestEnv};
use predicates::prelude::*;

/// Test that an empty installation lists nothing
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_list_empty() {
    let env = TestEnv::new();

    env.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("no scripts installed"));
}

/// Test that the table output shows name, ref, and repository
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_list_table_output() {
    let env = TestEnv::new();
    let repo = env.root.path().join("fixture");
    init_git_repo(&repo, &[("tool.py", "print('hello')\n")]);

    env.cmd()
        .arg("install")
        .arg(file_url(&repo))
        .arg("--script")
        .arg("tool.py")
        .assert()
        .success();

    env.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("NAME"))
        .stdout(predicate::str::contains("tool.py"))
        .stdout(predicate::str::contains("(default)"))
        .stdout(predicate::str::contains(file_url(&repo)));
}

/// Test that the JSON output carries the full records
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_list_json_output() {
    let env = TestEnv::new();
    let repo = env.root.path().join("fixture");
    init_git_repo(&repo, &[("tool.py", "print('hello')\n")]);
    let commit = head_commit(&repo);

    env.cmd()
        .arg("install")
        .arg(file_url(&repo))
        .arg("--script")
        .arg("tool.py")
        .assert()
        .success();

    let listed = env
        .cmd()
        .arg("list")
        .arg("--format")
        .arg("json")
        .assert()
        .success();
    let stdout = String::from_utf8(listed.get_output().stdout.clone()).unwrap();

    let records: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["name"], "tool.py");
    assert_eq!(records[0]["resolved_commit"], commit.as_str());
    assert!(records[0]["install_path"].as_str().unwrap().ends_with("tool.py"));
}

/// Test that an empty state serializes to an empty JSON array
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_list_json_empty() {
    let env = TestEnv::new();

    let listed = env
        .cmd()
        .arg("list")
        .arg("--format")
        .arg("json")
        .assert()
        .success();
    let stdout = String::from_utf8(listed.get_output().stdout.clone()).unwrap();
    let records: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(records.as_array().unwrap().len(), 0);
}
