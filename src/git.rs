//! # Git Synchronizer
//!
//! This module owns every interaction with Git. It uses the system `git`
//! command, which automatically handles:
//! - SSH keys from ~/.ssh/
//! - Git credential helpers
//! - Personal access tokens
//! - Any authentication configured in ~/.gitconfig
//!
//! Each repository URL maps 1:1 to a local clone directory under the
//! configured repository root (`clone_path_for`). The working copy is kept
//! in a detached-head state so it exactly reflects the requested ref without
//! creating local branches; update checks compare the concrete commit
//! actually checked out, not the user-supplied ref string.
//!
//! The [`GitSync`] trait is the seam the reconciliation engine programs
//! against, allowing tests to substitute a mock without running `git`.
//! [`SystemGit`] is the real implementation.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, warn};
use url::Url;

use crate::error::{Error, Result};

/// A repository URL with an optional ref extracted from install syntax.
///
/// `https://host/user/repo@v1.0.0` requests the tag `v1.0.0`;
/// `https://host/user/repo#dev` requests the branch `dev`. A bare URL
/// requests the remote's default branch (`reference` is `None`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSource {
    /// Repository URL with any ref suffix and trailing `.git` removed.
    pub base_url: String,
    /// Requested ref, if the URL carried one.
    pub reference: Option<String>,
}

/// The result of synchronizing a clone to a ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedClone {
    /// Local working copy for the repository URL.
    pub clone_path: PathBuf,
    /// Commit the working copy is checked out at.
    pub commit: String,
}

/// Trait for git synchronization - allows mocking in tests.
pub trait GitSync {
    /// Ensure a local clone of `url` exists and is checked out (detached)
    /// at `reference`, returning the clone path and resolved commit.
    ///
    /// `reference` may be a branch, a tag, or a raw commit id; `None` means
    /// the remote's default branch.
    fn ensure(&self, url: &str, reference: Option<&str>) -> Result<SyncedClone>;

    /// Resolve `reference` to a commit id without touching any working
    /// copy. Used for drift checks so an up-to-date script costs a fetch
    /// at most.
    fn resolve(&self, url: &str, reference: Option<&str>) -> Result<String>;
}

/// Real implementation of [`GitSync`] backed by the system `git` binary.
pub struct SystemGit {
    repo_dir: PathBuf,
    depth: u32,
}

impl SystemGit {
    pub fn new(repo_dir: PathBuf, depth: u32) -> Self {
        Self { repo_dir, depth }
    }

    /// Local clone path this synchronizer uses for `url`.
    pub fn clone_path(&self, url: &str) -> PathBuf {
        clone_path_for(&self.repo_dir, url)
    }

    fn clone_repository(&self, url: &str, target: &Path) -> Result<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let depth_arg = format!("--depth={}", self.depth);
        let output = Command::new("git")
            .args(["clone", &depth_arg, url])
            .arg(target)
            .output()
            .map_err(|e| Error::GitClone {
                url: url.to_string(),
                r#ref: "HEAD".to_string(),
                message: e.to_string(),
                hint: None,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            let hint = auth_hint(&stderr);
            return Err(Error::GitClone {
                url: url.to_string(),
                r#ref: "HEAD".to_string(),
                message: stderr,
                hint,
            });
        }

        Ok(())
    }

    /// Fetch `reference` (or the remote HEAD) into FETCH_HEAD.
    fn fetch(&self, url: &str, clone_path: &Path, reference: Option<&str>) -> Result<()> {
        let depth_arg = format!("--depth={}", self.depth);
        let target = reference.unwrap_or("HEAD");
        run_git(
            &["fetch", &depth_arg, "origin", target],
            Some(clone_path),
            url,
        )?;
        Ok(())
    }

    fn checkout_detached(&self, url: &str, clone_path: &Path, target: &str) -> Result<()> {
        // The working copy is entirely tool-managed: materialization
        // rewrites installed scripts in place, so a plain checkout would
        // refuse over those local edits. Forcing discards them; the
        // metadata is re-embedded right after synchronization.
        run_git(
            &["checkout", "--force", "--detach", target],
            Some(clone_path),
            url,
        )?;
        Ok(())
    }

    /// Bring the clone for `url` into existence, recovering from a
    /// corrupted directory by forcing a fresh clone.
    fn ensure_clone(&self, url: &str) -> Result<PathBuf> {
        let clone_path = self.clone_path(url);

        if clone_path.exists() && !is_valid_clone(&clone_path) {
            warn!(
                "clone at {} is corrupted, forcing a fresh clone",
                clone_path.display()
            );
            fs::remove_dir_all(&clone_path)?;
        }

        if !clone_path.exists() {
            debug!("cloning {} into {}", url, clone_path.display());
            self.clone_repository(url, &clone_path)?;
        }

        Ok(clone_path)
    }
}

impl GitSync for SystemGit {
    fn ensure(&self, url: &str, reference: Option<&str>) -> Result<SyncedClone> {
        let clone_path = self.ensure_clone(url)?;

        match reference {
            Some(r) => {
                // Branch/tag resolution first, raw commit id as fallback:
                // a commit already present in local history needs no fetch.
                match self.fetch(url, &clone_path, Some(r)) {
                    Ok(()) => self.checkout_detached(url, &clone_path, "FETCH_HEAD")?,
                    Err(fetch_err) => {
                        debug!("fetch of '{}' failed, trying it as a commit id", r);
                        if self.checkout_detached(url, &clone_path, r).is_err() {
                            return Err(fetch_err);
                        }
                    }
                }
            }
            None => {
                self.fetch(url, &clone_path, None)?;
                self.checkout_detached(url, &clone_path, "FETCH_HEAD")?;
            }
        }

        let commit = run_git(&["rev-parse", "HEAD"], Some(&clone_path), url)?
            .trim()
            .to_string();

        Ok(SyncedClone { clone_path, commit })
    }

    fn resolve(&self, url: &str, reference: Option<&str>) -> Result<String> {
        // A full commit id is already resolved.
        if let Some(r) = reference {
            if is_commit_id(r) {
                return Ok(r.to_ascii_lowercase());
            }
        }

        let clone_path = self.clone_path(url);
        if is_valid_clone(&clone_path) {
            self.fetch(url, &clone_path, reference)?;
            let commit = run_git(&["rev-parse", "FETCH_HEAD"], Some(&clone_path), url)?
                .trim()
                .to_string();
            return Ok(commit);
        }

        // No usable local clone: ask the remote directly.
        let target = reference.unwrap_or("HEAD");
        let stdout = run_git(&["ls-remote", url, target], None, url)?;
        match stdout.split_whitespace().next() {
            Some(commit) => Ok(commit.to_string()),
            None => Err(Error::GitCommand {
                command: format!("ls-remote {}", target),
                url: url.to_string(),
                stderr: format!("unknown ref '{}'", target),
            }),
        }
    }
}

/// Run a git command, capturing stdout and mapping failures to
/// [`Error::GitCommand`] with the stderr attached.
fn run_git(args: &[&str], cwd: Option<&Path>, url: &str) -> Result<String> {
    let mut cmd = Command::new("git");
    if let Some(dir) = cwd {
        cmd.arg("-C").arg(dir);
    }
    cmd.args(args);

    let output = cmd.output().map_err(|e| Error::GitCommand {
        command: args.join(" "),
        url: url.to_string(),
        stderr: e.to_string(),
    })?;

    if !output.status.success() {
        return Err(Error::GitCommand {
            command: args.join(" "),
            url: url.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Provide a helpful hint for common authentication failures.
fn auth_hint(stderr: &str) -> Option<String> {
    if stderr.contains("Authentication failed")
        || stderr.contains("Permission denied")
        || stderr.contains("Could not read from remote repository")
    {
        Some(
            "Make sure you have access to the repository: SSH key in ssh-agent, \
             git credentials configured, or a personal access token set up"
                .to_string(),
        )
    } else {
        None
    }
}

/// Check whether a directory is a usable git working copy.
fn is_valid_clone(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }
    Command::new("git")
        .arg("-C")
        .arg(path)
        .args(["rev-parse", "--git-dir"])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// True if `s` is a full 40-character hex commit id.
pub fn is_commit_id(s: &str) -> bool {
    s.len() == 40 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Convert a repository URL to its local clone path (1:1 mapping).
///
/// The directory name combines the repository name with a hash of the full
/// URL so repositories with the same name from different hosts never
/// collide.
pub fn clone_path_for(repo_dir: &Path, url: &str) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    let url_hash = format!("{:x}", hasher.finish());

    repo_dir.join(format!("{}-{}", repo_name_from_url(url), url_hash))
}

/// Extract a human-readable repository name from a URL.
pub fn repo_name_from_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/').trim_end_matches(".git");
    let last = trimmed
        .rsplit(|c| c == '/' || c == ':')
        .next()
        .unwrap_or(trimmed);
    if last.is_empty() {
        "repo".to_string()
    } else {
        last.to_string()
    }
}

/// Check whether a string plausibly names a git remote.
pub fn is_git_url(s: &str) -> bool {
    if let Ok(parsed) = Url::parse(s) {
        return matches!(
            parsed.scheme(),
            "https" | "http" | "git" | "ssh" | "file"
        );
    }
    // scp-like syntax: git@host:user/repo
    s.contains('@') && s.contains(':') && !s.contains("://")
}

/// Parse an install URL into its base URL and optional ref.
///
/// Supports `repo@tag` and `repo#branch` suffixes; a trailing `.git` on the
/// base URL is stripped. An `@` is only treated as a ref separator when it
/// appears after the final path segment starts, so scp-style URLs
/// (`git@host:user/repo`) are left intact.
pub fn parse_git_url(raw: &str) -> Result<GitSource> {
    if !is_git_url(raw) {
        return Err(Error::InvalidUrl {
            url: raw.to_string(),
        });
    }

    let (rest, reference) = if let Some(pos) = raw.rfind('#') {
        (&raw[..pos], Some(raw[pos + 1..].to_string()))
    } else {
        // Only an '@' inside the final path segment is a ref separator;
        // the '@' of user-info (git@host:...) always precedes a '/'.
        match raw.rfind('/').and_then(|slash| {
            raw[slash..].rfind('@').map(|offset| slash + offset)
        }) {
            Some(pos) => (&raw[..pos], Some(raw[pos + 1..].to_string())),
            None => (raw, None),
        }
    };

    let base_url = rest.trim_end_matches('/').trim_end_matches(".git");

    match reference {
        Some(r) if r.is_empty() => Err(Error::InvalidUrl {
            url: raw.to_string(),
        }),
        reference => Ok(GitSource {
            base_url: base_url.to_string(),
            reference,
        }),
    }
}

/// Verify that the `git` command is available.
pub fn verify_git_available() -> Result<()> {
    let ok = Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);
    if ok {
        Ok(())
    } else {
        Err(Error::GitCommand {
            command: "--version".to_string(),
            url: String::new(),
            stderr: "git is not installed or not in PATH".to_string(),
        })
    }
}
