//! Install command implementation
//!
//! Installs one or more scripts from a git repository: clones or fetches
//! the repository, resolves the requested ref, embeds dependency metadata,
//! and creates entry-point symlinks. Re-running the same install is a
//! no-op for scripts that are already up to date.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use log::warn;

use uv_helper::config;
use uv_helper::git;
use uv_helper::installer;
use uv_helper::output::OutputConfig;
use uv_helper::reconcile::{DesiredScript, Reconciler};

/// Arguments for the install command
#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Repository URL; append `@tag` or `#branch` to pin a ref
    #[arg(value_name = "URL")]
    pub url: String,

    /// Script path(s) within the repository (repeatable)
    #[arg(short, long = "script", value_name = "PATH", required = true)]
    pub scripts: Vec<PathBuf>,

    /// Branch, tag, or commit to install (alternative to the URL suffix)
    #[arg(short = 'r', long = "ref", value_name = "REF")]
    pub reference: Option<String>,

    /// Additional dependency specifier (repeatable)
    #[arg(short = 'w', long = "with", value_name = "SPEC")]
    pub with: Vec<String>,

    /// Reinstall even when already up to date
    #[arg(short, long)]
    pub force: bool,

    /// Directory for entry-point symlinks (overrides configuration)
    #[arg(long, value_name = "PATH")]
    pub install_dir: Option<PathBuf>,
}

/// Execute the install command
pub fn execute(args: InstallArgs, config_path: Option<&Path>, output: &OutputConfig) -> Result<()> {
    git::verify_git_available()?;
    if !installer::uv_available() {
        warn!("uv not found in PATH; installed scripts need uv to run");
    }

    let mut settings = config::load(config_path)?;
    if let Some(dir) = args.install_dir {
        settings.install_dir = dir;
    }

    let mut source = git::parse_git_url(&args.url)?;
    if let Some(reference) = args.reference {
        if source.reference.is_some() {
            anyhow::bail!("a ref was given both in the URL and via --ref");
        }
        source.reference = Some(reference);
    }

    let reconciler = Reconciler::new(settings);

    let mut failures = 0usize;
    let mut conflicts = 0usize;

    for script in &args.scripts {
        let desired = DesiredScript::new(&source, script, args.with.clone());

        let spinner = output.spinner(&format!("installing {}", desired.name));
        let outcome = reconciler.install(&desired, args.force);
        spinner.finish_and_clear();

        match outcome {
            Ok(action) => {
                println!("{} {}", output.action_label(action), desired.name);
                if action.is_conflict() {
                    conflicts += 1;
                }
            }
            Err(e) => {
                println!("{} {}: {}", output.error_label(), desired.name, e);
                failures += 1;
            }
        }
    }

    if failures > 0 || conflicts > 0 {
        anyhow::bail!(
            "{} of {} script(s) not installed ({} failed, {} conflicted)",
            failures + conflicts,
            args.scripts.len(),
            failures,
            conflicts
        );
    }
    Ok(())
}
