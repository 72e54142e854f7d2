//! # Configuration Schema and Parsing
//!
//! This module defines the `Settings` structure that represents the
//! `config.toml` configuration file, as well as the logic for loading it.
//!
//! The on-disk format is a sectioned TOML document:
//!
//! ```toml
//! [paths]
//! repo_dir = "~/.local/share/uv-helper"
//! install_dir = "~/.local/bin"
//! state_file = "~/.local/share/uv-helper/state.json"
//!
//! [git]
//! clone_depth = 1
//! follow_branches = true
//!
//! [install]
//! auto_chmod = true
//! ```
//!
//! Every field is optional; missing values fall back to the defaults in
//! [`crate::defaults`]. When no configuration file exists at all, a default
//! one is written back for future runs, but a failure to write it (read-only
//! home, permissions) is only logged and never fatal.
//!
//! The resolved `Settings` value is a plain data structure handed to the
//! reconciliation engine; nothing in the core reads the file directly.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root directory holding repository clones.
    pub repo_dir: PathBuf,
    /// Directory where entry-point symlinks are created.
    pub install_dir: PathBuf,
    /// Path of the persisted state document.
    pub state_file: PathBuf,
    /// Git clone/fetch depth (>= 1).
    pub clone_depth: u32,
    /// Whether `update` re-resolves branch refs to their latest commit.
    pub follow_branches: bool,
    /// Whether installed scripts get the executable bit set.
    pub auto_chmod: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repo_dir: defaults::default_repo_dir(),
            install_dir: defaults::default_install_dir(),
            state_file: defaults::default_state_file(),
            clone_depth: 1,
            follow_branches: true,
            auto_chmod: true,
        }
    }
}

/// On-disk TOML schema. Sections and fields are all optional so old
/// configuration files keep working as new options are added.
#[derive(Debug, Default, Serialize, Deserialize)]
struct FileSchema {
    #[serde(default)]
    paths: PathsSection,
    #[serde(default)]
    git: GitSection,
    #[serde(default)]
    install: InstallSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PathsSection {
    repo_dir: Option<String>,
    install_dir: Option<String>,
    state_file: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GitSection {
    clone_depth: Option<u32>,
    follow_branches: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct InstallSection {
    auto_chmod: Option<bool>,
}

/// Expand a leading `~` to the user's home directory.
fn expand_path(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

/// Determine the configuration file path.
///
/// Priority: explicit path argument, then the `UV_HELPER_CONFIG`
/// environment variable, then the platform default.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(env_path) = std::env::var("UV_HELPER_CONFIG") {
        if !env_path.is_empty() {
            return expand_path(&env_path);
        }
    }
    defaults::default_config_path()
}

/// Load settings from the given file, or from the default location.
///
/// A missing file yields default settings; the defaults are written back
/// best-effort so the user has a file to edit. An unreadable or malformed
/// file is an error.
pub fn load(explicit: Option<&Path>) -> Result<Settings> {
    let path = config_path(explicit);

    if !path.exists() {
        debug!("no config file at {}, using defaults", path.display());
        let settings = Settings::default();
        if let Err(e) = save(&settings, &path) {
            warn!("could not write default config to {}: {}", path.display(), e);
        }
        return Ok(settings);
    }

    let raw = fs::read_to_string(&path)?;
    let schema: FileSchema = toml::from_str(&raw)?;
    from_schema(schema)
}

fn from_schema(schema: FileSchema) -> Result<Settings> {
    let defaults = Settings::default();

    let clone_depth = schema.git.clone_depth.unwrap_or(defaults.clone_depth);
    if clone_depth == 0 {
        return Err(Error::ConfigParse {
            message: "clone_depth must be >= 1".to_string(),
            hint: Some("set [git] clone_depth to a positive integer".to_string()),
        });
    }

    Ok(Settings {
        repo_dir: schema
            .paths
            .repo_dir
            .as_deref()
            .map(expand_path)
            .unwrap_or(defaults.repo_dir),
        install_dir: schema
            .paths
            .install_dir
            .as_deref()
            .map(expand_path)
            .unwrap_or(defaults.install_dir),
        state_file: schema
            .paths
            .state_file
            .as_deref()
            .map(expand_path)
            .unwrap_or(defaults.state_file),
        clone_depth,
        follow_branches: schema
            .git
            .follow_branches
            .unwrap_or(defaults.follow_branches),
        auto_chmod: schema.install.auto_chmod.unwrap_or(defaults.auto_chmod),
    })
}

/// Write settings back out as a sectioned TOML document.
pub fn save(settings: &Settings, path: &Path) -> Result<()> {
    let schema = FileSchema {
        paths: PathsSection {
            repo_dir: Some(settings.repo_dir.to_string_lossy().into_owned()),
            install_dir: Some(settings.install_dir.to_string_lossy().into_owned()),
            state_file: Some(settings.state_file.to_string_lossy().into_owned()),
        },
        git: GitSection {
            clone_depth: Some(settings.clone_depth),
            follow_branches: Some(settings.follow_branches),
        },
        install: InstallSection {
            auto_chmod: Some(settings.auto_chmod),
        },
    };

    let rendered = toml::to_string_pretty(&schema).map_err(|e| Error::ConfigParse {
        message: format!("failed to serialize configuration: {}", e),
        hint: None,
    })?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, rendered)?;
    Ok(())
}
