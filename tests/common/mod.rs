//! Shared helpers for end-to-end tests
//!
//! Provides an isolated environment (config file, clone root, install
//! directory, state file inside one temp dir) and small wrappers around
//! the system `git` binary for building local fixture repositories.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_fs::TempDir;

/// One isolated uv-helper environment backed by a temp directory.
pub struct TestEnv {
    pub root: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("repos")).unwrap();
        std::fs::create_dir_all(root.path().join("bin")).unwrap();

        let config = format!(
            r#"[paths]
repo_dir = "{repos}"
install_dir = "{bin}"
state_file = "{state}"

[git]
clone_depth = 1
follow_branches = true

[install]
auto_chmod = true
"#,
            repos = root.path().join("repos").display(),
            bin = root.path().join("bin").display(),
            state = root.path().join("state.json").display(),
        );
        std::fs::write(root.path().join("config.toml"), config).unwrap();

        Self { root }
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.path().join("config.toml")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.path().join("bin")
    }

    pub fn state_file(&self) -> PathBuf {
        self.root.path().join("state.json")
    }

    /// A CLI invocation wired to this environment.
    pub fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("uv-helper");
        cmd.env("UV_HELPER_CONFIG", self.config_path());
        cmd.env("NO_COLOR", "1");
        cmd
    }
}

fn run_git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args([
            "-c",
            "user.name=test",
            "-c",
            "user.email=test@example.invalid",
        ])
        .args(args)
        .status()
        .expect("failed to run git");
    assert!(status.success(), "git {:?} failed in {}", args, dir.display());
}

/// Initialize a git repository at `dir` with the given files committed.
pub fn init_git_repo(dir: &Path, files: &[(&str, &str)]) {
    std::fs::create_dir_all(dir).unwrap();
    run_git(dir, &["init", "--quiet"]);
    write_files(dir, files);
    commit_all(dir, "initial commit");
}

/// Write (or overwrite) files in the working tree.
pub fn write_files(dir: &Path, files: &[(&str, &str)]) {
    for (name, content) in files {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }
}

/// Stage and commit everything in the working tree.
pub fn commit_all(dir: &Path, message: &str) {
    run_git(dir, &["add", "-A"]);
    run_git(dir, &["commit", "--quiet", "-m", message]);
}

pub fn tag(dir: &Path, name: &str) {
    run_git(dir, &["tag", name]);
}

pub fn head_commit(dir: &Path) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["rev-parse", "HEAD"])
        .output()
        .expect("failed to run git rev-parse");
    assert!(output.status.success());
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

/// `file://` URL for a local fixture repository.
pub fn file_url(dir: &Path) -> String {
    format!("file://{}", dir.display())
}
