//! # Output Configuration
//!
//! Controls the appearance of CLI output: color support detection, styled
//! action labels, and progress spinners for long git operations.
//!
//! ## Respecting User Preferences
//!
//! The following environment variables and flags are honored:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use std::env;
use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::reconcile::Action;

/// Output configuration for controlling colors and progress display.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// - `--color=always`: Force colors on (overrides NO_COLOR)
    /// - `--color=never`: Force colors off
    /// - `--color=auto`: Detect based on environment
    ///
    /// In auto mode, colors are disabled if `NO_COLOR` is set (any value,
    /// including empty), `CLICOLOR=0` is set, `TERM=dumb` is set, or stdout
    /// is not a TTY (unless `CLICOLOR_FORCE=1`).
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // Presence of NO_COLOR (even empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    /// Style for one reconciliation outcome, or plain when colors are off.
    fn action_style(&self, action: Action) -> Style {
        if !self.use_color {
            return Style::new();
        }
        match action {
            Action::Installed => Style::new().green().bold(),
            Action::Updated => Style::new().cyan().bold(),
            Action::Skipped => Style::new().dim(),
            Action::Removed => Style::new().yellow(),
            Action::Conflict => Style::new().red().bold(),
        }
    }

    /// Render an action as a padded, possibly colored label for one-line
    /// per-script status output.
    pub fn action_label(&self, action: Action) -> String {
        let label = format!("{:>10}", action.to_string());
        self.action_style(action).apply_to(label).to_string()
    }

    /// Render an error marker for per-script failure lines.
    pub fn error_label(&self) -> String {
        let style = if self.use_color {
            Style::new().red().bold()
        } else {
            Style::new()
        };
        style.apply_to(format!("{:>10}", "error")).to_string()
    }

    /// A spinner for long-running git operations. Hidden entirely when
    /// colors are disabled so scripted invocations stay clean.
    pub fn spinner(&self, message: &str) -> ProgressBar {
        if !self.use_color {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }

    /// Create a configuration with colors always enabled.
    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    /// Create a configuration with colors always disabled.
    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}
