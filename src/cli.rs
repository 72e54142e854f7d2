//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use uv_helper::output::OutputConfig;

use crate::commands;

/// uv-helper - Install and update standalone Python scripts from git
#[derive(Parser, Debug)]
#[command(name = "uv-helper")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,

    /// Path to the configuration file
    #[arg(long, global = true, value_name = "PATH", env = "UV_HELPER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install scripts from a git repository
    Install(commands::install::InstallArgs),

    /// List installed scripts
    List(commands::list::ListArgs),

    /// Update installed scripts to the latest commit of their ref
    Update(commands::update::UpdateArgs),

    /// Remove an installed script
    Remove(commands::remove::RemoveArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        env_logger::Builder::new()
            .parse_filters(&self.log_level)
            .format_timestamp(None)
            .init();

        let output = OutputConfig::from_env_and_flag(&self.color);
        let config = self.config.as_deref();

        match self.command {
            Commands::Install(args) => commands::install::execute(args, config, &output),
            Commands::List(args) => commands::list::execute(args, config),
            Commands::Update(args) => commands::update::execute(args, config, &output),
            Commands::Remove(args) => commands::remove::execute(args, config, &output),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}
