//! Default values for uv-helper configuration.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Returns the default repository cache directory.
///
/// Uses the platform-appropriate data directory:
/// - Linux: `~/.local/share/uv-helper` (XDG Base Directory)
/// - macOS: `~/Library/Application Support/uv-helper`
///
/// Falls back to `.uv-helper` in the current directory if the platform
/// data directory cannot be determined.
pub fn default_repo_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from(".uv-helper"))
        .join("uv-helper")
}

/// Returns the default entry-point install directory (`~/.local/bin`).
pub fn default_install_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".local")
        .join("bin")
}

/// Returns the default state file path, inside the repository cache
/// directory so both move together.
pub fn default_state_file() -> PathBuf {
    default_repo_dir().join("state.json")
}

/// Returns the default configuration file path.
///
/// Can be overridden by the `UV_HELPER_CONFIG` environment variable or the
/// `--config` CLI flag.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("uv-helper")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_repo_dir_ends_with_app_name() {
        assert!(default_repo_dir().ends_with("uv-helper"));
    }

    #[test]
    fn test_default_state_file_lives_in_repo_dir() {
        let state = default_state_file();
        assert!(state.starts_with(default_repo_dir()));
        assert!(state.ends_with("state.json"));
    }

    #[test]
    fn test_default_config_path_is_toml() {
        let config = default_config_path();
        assert_eq!(config.extension().unwrap(), "toml");
    }
}
