//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for the
//! `uv-helper` application. It uses the `thiserror` library to create a
//! comprehensive `Error` enum that covers all anticipated failure modes,
//! providing clear and descriptive error messages.
//!
//! The taxonomy mirrors the three failure domains of the tool:
//!
//! - **Git synchronization** (`GitClone`, `GitCommand`): unreachable remotes,
//!   authentication failures, unknown refs, corrupted clones. These are
//!   recoverable by retrying or forcing a fresh clone.
//! - **Script installation** (`ScriptInstall`, `NameCollision`): missing
//!   scripts, entry-point collisions, permission failures. Not retried
//!   automatically; the message carries the offending path or name.
//! - **State consistency** (`StateConflict`, `State`): a record exists but
//!   the filesystem artifact does not match expectations. Never
//!   auto-resolved.
//!
//! The `Result<T>` alias is used throughout the library so component
//! failures propagate with `?` rather than being swallowed.

use thiserror::Error;

/// Main error type for uv-helper operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error occurred while parsing the configuration file.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An error occurred while cloning a Git repository.
    ///
    /// Includes the repository URL, ref (branch/tag/commit), error message,
    /// and an optional hint for resolution.
    #[error("Git clone error for {url}@{r#ref}: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    GitClone {
        url: String,
        r#ref: String,
        message: String,
        /// Optional hint for how to resolve the clone issue
        hint: Option<String>,
    },

    /// An error occurred while executing a Git command.
    #[error("Git command failed for {url}: {command} - {stderr}")]
    GitCommand {
        command: String,
        url: String,
        stderr: String,
    },

    /// An error occurred while installing or processing a script.
    #[error("Script installation error for {path}: {message}")]
    ScriptInstall { path: String, message: String },

    /// An entry point with this name already exists and is not owned by
    /// the script being installed.
    #[error("Entry point name collision: '{name}' already exists at {path} and is not managed by uv-helper")]
    NameCollision { name: String, path: String },

    /// A state record exists but the installed artifact does not match it.
    ///
    /// This indicates manual tampering (e.g., a replaced symlink) and is
    /// surfaced as a conflict, never auto-resolved.
    #[error("State conflict for '{name}': {message}")]
    StateConflict { name: String, message: String },

    /// The named script has no record in the state store.
    #[error("Script '{name}' is not installed")]
    ScriptNotFound { name: String },

    /// An error occurred with a state store operation.
    #[error("State store error: {message}")]
    State { message: String },

    /// The given install source is not a valid Git URL.
    #[error("Invalid Git URL: {url}")]
    InvalidUrl { url: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON (de)serialization error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A TOML parsing error, wrapped from `toml::de::Error`.
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config_parse() {
        let error = Error::ConfigParse {
            message: "Invalid TOML".to_string(),
            hint: None,
        };
        let display = format!("{}", error);
        assert!(display.contains("Configuration parsing error"));
        assert!(display.contains("Invalid TOML"));
    }

    #[test]
    fn test_error_display_config_parse_with_hint() {
        let error = Error::ConfigParse {
            message: "clone_depth must be >= 1".to_string(),
            hint: Some("Set [git] clone_depth to a positive integer".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("hint:"));
        assert!(display.contains("clone_depth"));
    }

    #[test]
    fn test_error_display_git_clone() {
        let error = Error::GitClone {
            url: "https://github.com/test/repo.git".to_string(),
            r#ref: "main".to_string(),
            message: "Authentication failed".to_string(),
            hint: None,
        };
        let display = format!("{}", error);
        assert!(display.contains("Git clone error"));
        assert!(display.contains("https://github.com/test/repo.git"));
        assert!(display.contains("main"));
        assert!(display.contains("Authentication failed"));
    }

    #[test]
    fn test_error_display_git_command() {
        let error = Error::GitCommand {
            command: "fetch origin v1.0.0".to_string(),
            url: "https://github.com/test/repo.git".to_string(),
            stderr: "couldn't find remote ref".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Git command failed"));
        assert!(display.contains("fetch origin v1.0.0"));
        assert!(display.contains("couldn't find remote ref"));
    }

    #[test]
    fn test_error_display_script_install() {
        let error = Error::ScriptInstall {
            path: "/repo/tools/missing.py".to_string(),
            message: "not a regular file".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Script installation error"));
        assert!(display.contains("/repo/tools/missing.py"));
        assert!(display.contains("not a regular file"));
    }

    #[test]
    fn test_error_display_name_collision() {
        let error = Error::NameCollision {
            name: "deploy.py".to_string(),
            path: "/home/user/.local/bin/deploy.py".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("collision"));
        assert!(display.contains("deploy.py"));
        assert!(display.contains("/home/user/.local/bin/deploy.py"));
    }

    #[test]
    fn test_error_display_state_conflict() {
        let error = Error::StateConflict {
            name: "deploy.py".to_string(),
            message: "entry point was replaced manually".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("State conflict"));
        assert!(display.contains("replaced manually"));
    }

    #[test]
    fn test_error_display_script_not_found() {
        let error = Error::ScriptNotFound {
            name: "ghost.py".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("ghost.py"));
        assert!(display.contains("not installed"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_from_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{unclosed").unwrap_err();
        let error: Error = json_error.into();
        let display = format!("{}", error);
        assert!(display.contains("JSON error"));
    }

    #[test]
    fn test_error_from_toml_error() {
        let toml_error = toml::from_str::<toml::Value>("invalid = [unclosed").unwrap_err();
        let error: Error = toml_error.into();
        let display = format!("{}", error);
        assert!(display.contains("TOML parsing error"));
    }
}
