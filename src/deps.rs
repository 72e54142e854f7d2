//! # Dependency Resolver
//!
//! Merges explicitly requested dependency specifiers with entries discovered
//! in a repository-provided `requirements.txt` manifest into a single
//! ordered, de-duplicated list.
//!
//! Ordering is deterministic: explicit dependencies come first, in the order
//! given; manifest entries are appended only when their normalized package
//! name is not already present. Deterministic ordering is what makes
//! entry-point regeneration reproducible and installs idempotent.
//!
//! De-duplication matches on the package-name segment of a specifier,
//! case-insensitively and with `_`/`.` treated as `-` (PEP 503 style), so
//! `Requests>=2.0` and `requests` count as the same package.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::Result;

/// Name of the dependency manifest searched for in the repository.
pub const MANIFEST_NAME: &str = "requirements.txt";

/// Resolve the dependency set for a script.
///
/// Starts from `explicit` (order preserved), then appends entries from a
/// `requirements.txt` found next to the script or at the repository root,
/// skipping any package already present.
pub fn resolve(
    explicit: &[String],
    clone_path: &Path,
    script_relative_path: &Path,
) -> Result<Vec<String>> {
    let mut resolved: Vec<String> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    for spec in explicit {
        let spec = spec.trim();
        if spec.is_empty() {
            continue;
        }
        let name = normalize_package_name(spec);
        if !seen.contains(&name) {
            seen.push(name);
            resolved.push(spec.to_string());
        }
    }

    if let Some(manifest) = find_manifest(clone_path, script_relative_path) {
        debug!("merging dependency manifest {}", manifest.display());
        let content = fs::read_to_string(&manifest)?;
        for spec in parse_requirements(&content) {
            let name = normalize_package_name(&spec);
            if !seen.contains(&name) {
                seen.push(name);
                resolved.push(spec);
            }
        }
    }

    Ok(resolved)
}

/// Locate the dependency manifest: next to the script first, repository
/// root second.
fn find_manifest(clone_path: &Path, script_relative_path: &Path) -> Option<PathBuf> {
    if let Some(parent) = script_relative_path.parent() {
        let beside_script = clone_path.join(parent).join(MANIFEST_NAME);
        if beside_script.is_file() {
            return Some(beside_script);
        }
    }
    let at_root = clone_path.join(MANIFEST_NAME);
    at_root.is_file().then_some(at_root)
}

/// Parse a requirements file into bare specifiers.
///
/// Blank lines, comments, and pip option lines (`-r`, `--index-url`, ...)
/// are skipped; inline comments are stripped.
pub fn parse_requirements(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let line = match line.find(" #") {
                Some(pos) => &line[..pos],
                None => line,
            };
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
                None
            } else {
                Some(line.to_string())
            }
        })
        .collect()
}

/// Extract and normalize the package-name segment of a specifier.
///
/// `Requests[socks]>=2.0 ; python_version > "3.8"` normalizes to
/// `requests`.
pub fn normalize_package_name(spec: &str) -> String {
    let name_end = spec
        .find(|c: char| "=<>!~;[@( ".contains(c))
        .unwrap_or(spec.len());
    spec[..name_end]
        .trim()
        .to_ascii_lowercase()
        .replace(['_', '.'], "-")
}
