//! End-to-end tests for the `remove` command

mod common;

use common::{file_url, init_git_repo, TestEnv};
use predicates::prelude::*;

fn install(env: &TestEnv, repo: &std::path::Path, script: &str) {
    env.cmd()
        .arg("install")
        .arg(file_url(repo))
        .arg("--script")
        .arg(script)
        .assert()
        .success();
}

/// Test that remove deletes the entry point and the record
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_remove_deletes_entry_point_and_record() {
    let env = TestEnv::new();
    let repo = env.root.path().join("fixture");
    init_git_repo(&repo, &[("tool.py", "print('hello')\n")]);
    install(&env, &repo, "tool.py");

    env.cmd()
        .arg("remove")
        .arg("tool.py")
        .arg("--yes")
        .assert()
        .success()
        .stdout(predicate::str::contains("removed"));

    assert!(env.bin_dir().join("tool.py").symlink_metadata().is_err());

    let listed = env.cmd().arg("list").assert().success();
    let stdout = String::from_utf8(listed.get_output().stdout.clone()).unwrap();
    assert!(stdout.contains("no scripts installed"));
}

/// Test that the clone is kept by default and pruned with --clean-repo
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_remove_clean_repo_prunes_unreferenced_clone() {
    let env = TestEnv::new();
    let repo = env.root.path().join("fixture");
    init_git_repo(
        &repo,
        &[("alpha.py", "print('a')\n"), ("beta.py", "print('b')\n")],
    );
    install(&env, &repo, "alpha.py");
    install(&env, &repo, "beta.py");

    let clone_dir = std::fs::read_link(env.bin_dir().join("alpha.py"))
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf();

    // First removal keeps the clone: beta.py still references it
    env.cmd()
        .arg("remove")
        .arg("alpha.py")
        .arg("--yes")
        .arg("--clean-repo")
        .assert()
        .success();
    assert!(clone_dir.is_dir());

    // Last removal with --clean-repo prunes it
    env.cmd()
        .arg("remove")
        .arg("beta.py")
        .arg("--yes")
        .arg("--clean-repo")
        .assert()
        .success();
    assert!(!clone_dir.exists());
}

/// Test that removing an unknown script fails
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_remove_unknown_script_fails() {
    let env = TestEnv::new();

    env.cmd()
        .arg("remove")
        .arg("ghost.py")
        .arg("--yes")
        .assert()
        .failure();
}

/// Test that a replaced entry point is never deleted
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_remove_leaves_foreign_entry_point_alone() {
    let env = TestEnv::new();
    let repo = env.root.path().join("fixture");
    init_git_repo(&repo, &[("tool.py", "print('hello')\n")]);
    install(&env, &repo, "tool.py");

    // Replace the managed symlink with a user file
    let entry = env.bin_dir().join("tool.py");
    std::fs::remove_file(&entry).unwrap();
    std::fs::write(&entry, "user content").unwrap();

    env.cmd()
        .arg("remove")
        .arg("tool.py")
        .arg("--yes")
        .assert()
        .failure()
        .stdout(predicate::str::contains("conflict"));

    assert_eq!(std::fs::read_to_string(&entry).unwrap(), "user content");
}
