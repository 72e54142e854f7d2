//! # Installer
//!
//! Materializes a runnable entry point for a script inside a repository
//! clone. Three artifacts are produced:
//!
//! 1. The script itself is rewritten in place (temp file + rename) so its
//!    shebang is `#!/usr/bin/env -S uv run --script` and its dependency
//!    list is embedded as a PEP 723 inline metadata block. `uv` provisions
//!    the dependencies at invocation time; no separate install step exists.
//! 2. The script gets the executable bit.
//! 3. A symlink with the script's base name is created in the install
//!    directory, pointing at the absolute script path so it stays valid
//!    regardless of the caller's working directory.
//!
//! Materialization is atomic with respect to observers: both the rewritten
//! script and the symlink are staged at a temporary path and moved into
//! place with a single rename, so a concurrent reader never sees a
//! half-written entry point.
//!
//! An existing entry point that is *not* a symlink owned by the same
//! logical script is never overwritten; that is a name collision.

use std::fs;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;

use crate::error::{Error, Result};

/// Shebang that routes execution through uv's script runner.
pub const UV_SHEBANG: &str = "#!/usr/bin/env -S uv run --script";

const METADATA_OPEN: &str = "# /// script";
const METADATA_CLOSE: &str = "# ///";

/// Materialize the entry point for a script.
///
/// Verifies the script exists as a regular file inside the clone, embeds
/// the dependency metadata, sets permissions, and links it into
/// `install_dir`. Returns the absolute entry-point path.
pub fn materialize(
    clone_path: &Path,
    script_relative_path: &Path,
    dependencies: &[String],
    install_dir: &Path,
    auto_chmod: bool,
) -> Result<PathBuf> {
    let script_path = clone_path.join(script_relative_path);
    if !script_path.is_file() {
        return Err(Error::ScriptInstall {
            path: script_path.display().to_string(),
            message: "script does not exist or is not a regular file in the repository"
                .to_string(),
        });
    }
    // Resolve to an absolute target so the symlink survives cwd changes
    // and clone-path prefix differences.
    let script_path = fs::canonicalize(&script_path)?;

    embed_metadata(&script_path, dependencies)?;

    if auto_chmod {
        let mut perms = fs::metadata(&script_path)?.permissions();
        perms.set_mode(perms.mode() | 0o755);
        fs::set_permissions(&script_path, perms).map_err(|e| Error::ScriptInstall {
            path: script_path.display().to_string(),
            message: format!("failed to set executable permissions: {}", e),
        })?;
    }

    let entry_name = script_path
        .file_name()
        .ok_or_else(|| Error::ScriptInstall {
            path: script_path.display().to_string(),
            message: "script path has no file name".to_string(),
        })?
        .to_string_lossy()
        .into_owned();

    fs::create_dir_all(install_dir)?;
    let install_dir = fs::canonicalize(install_dir)?;
    let entry_path = install_dir.join(&entry_name);

    if entry_exists(&entry_path) && !is_owned_by(&entry_path, &script_path) {
        return Err(Error::NameCollision {
            name: entry_name,
            path: entry_path.display().to_string(),
        });
    }

    atomic_symlink(&script_path, &entry_path)?;
    debug!(
        "entry point {} -> {}",
        entry_path.display(),
        script_path.display()
    );

    Ok(entry_path)
}

/// Whether an entry point (possibly a dangling symlink) exists at `path`.
pub fn entry_exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Whether the entry point at `path` is a symlink whose target is exactly
/// `script_path`.
pub fn is_owned_by(entry_path: &Path, script_path: &Path) -> bool {
    match fs::read_link(entry_path) {
        Ok(target) => target == script_path,
        Err(_) => false,
    }
}

/// Whether the entry point at `path` is a symlink pointing anywhere inside
/// `clone_path`. Used by reconciliation to recognize its own artifacts
/// across ref changes.
pub fn is_owned_by_clone(entry_path: &Path, clone_path: &Path) -> bool {
    // Symlink targets are canonical; the stored clone path may not be.
    let clone_path = fs::canonicalize(clone_path).unwrap_or_else(|_| clone_path.to_path_buf());
    match fs::read_link(entry_path) {
        Ok(target) => target.starts_with(&clone_path),
        Err(_) => false,
    }
}

/// Whether the `uv` launcher the rewritten shebang depends on is reachable
/// on `PATH`. Installation never invokes uv itself, so a missing launcher
/// only means the entry points will not run until it is installed.
pub fn uv_available() -> bool {
    launcher_responds("uv")
}

fn launcher_responds(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Delete the entry point, tolerating an already-missing file.
pub fn remove_entry_point(entry_path: &Path) -> Result<()> {
    match fs::remove_file(entry_path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::ScriptInstall {
            path: entry_path.display().to_string(),
            message: format!("failed to remove entry point: {}", e),
        }),
    }
}

/// Create (or replace) a symlink atomically: stage at a temporary name in
/// the same directory, then rename into place.
fn atomic_symlink(target: &Path, link_path: &Path) -> Result<()> {
    let staged = staging_path(link_path)?;
    // A stale staged link from an interrupted run is safe to discard.
    if staged.symlink_metadata().is_ok() {
        fs::remove_file(&staged)?;
    }

    symlink(target, &staged).map_err(|e| Error::ScriptInstall {
        path: link_path.display().to_string(),
        message: format!("failed to create symlink: {}", e),
    })?;

    fs::rename(&staged, link_path).map_err(|e| Error::ScriptInstall {
        path: link_path.display().to_string(),
        message: format!("failed to move entry point into place: {}", e),
    })
}

/// Temporary staging name for an entry point, in the same directory so the
/// final rename is a single atomic filesystem operation.
pub fn staging_path(link_path: &Path) -> Result<PathBuf> {
    let parent = link_path.parent().ok_or_else(|| Error::ScriptInstall {
        path: link_path.display().to_string(),
        message: "entry point path has no parent directory".to_string(),
    })?;
    let name = link_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "entry".to_string());
    Ok(parent.join(format!(".{}.staged", name)))
}

/// Rewrite the script so its first line is the uv shebang and a PEP 723
/// metadata block with `dependencies` follows. Any previous shebang or
/// metadata block is replaced. The write goes through a temp file and a
/// rename in the script's own directory.
pub fn embed_metadata(script_path: &Path, dependencies: &[String]) -> Result<()> {
    let original = fs::read_to_string(script_path).map_err(|e| Error::ScriptInstall {
        path: script_path.display().to_string(),
        message: format!("failed to read script: {}", e),
    })?;

    let body = strip_header(&original);

    let mut rewritten = String::with_capacity(original.len() + 128);
    rewritten.push_str(UV_SHEBANG);
    rewritten.push('\n');
    rewritten.push_str(METADATA_OPEN);
    rewritten.push('\n');
    if dependencies.is_empty() {
        rewritten.push_str("# dependencies = []\n");
    } else {
        rewritten.push_str("# dependencies = [\n");
        for dep in dependencies {
            rewritten.push_str(&format!("#     \"{}\",\n", dep));
        }
        rewritten.push_str("# ]\n");
    }
    rewritten.push_str(METADATA_CLOSE);
    rewritten.push('\n');
    rewritten.push_str(body);

    let parent = script_path.parent().ok_or_else(|| Error::ScriptInstall {
        path: script_path.display().to_string(),
        message: "script path has no parent directory".to_string(),
    })?;
    let tmp = parent.join(format!(
        ".{}.rewrite",
        script_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "script".to_string())
    ));
    fs::write(&tmp, rewritten)?;
    // Preserve the original permission bits across the rename.
    if let Ok(meta) = fs::metadata(script_path) {
        let _ = fs::set_permissions(&tmp, meta.permissions());
    }
    fs::rename(&tmp, script_path)?;
    Ok(())
}

/// Drop an existing shebang line and PEP 723 `script` block from the top
/// of the file, returning the remaining body.
fn strip_header(content: &str) -> &str {
    let mut rest = content;

    if rest.starts_with("#!") {
        rest = match rest.find('\n') {
            Some(pos) => &rest[pos + 1..],
            None => "",
        };
    }

    // Only a block at the very top of the file (after the shebang) is a
    // header; one further down is script content.
    let trimmed = rest.trim_start_matches('\n');
    if trimmed.starts_with(METADATA_OPEN) {
        let mut offset = 0;
        for line in trimmed.split_inclusive('\n') {
            offset += line.len();
            if line.trim_end() == METADATA_CLOSE {
                return &trimmed[offset..];
            }
        }
        // Unterminated block: treat everything after the opener as body
        // rather than silently deleting the file's content.
        return rest;
    }

    rest
}
